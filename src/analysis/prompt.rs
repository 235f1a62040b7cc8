//! Prompt construction and completion parsing

use crate::error::{Error, Result};
use crate::models::{AnalysisResult, UsageRecord};
use serde_json::Value;

/// Analyst persona plus the exact JSON shape the reply must follow
pub const SYSTEM_PROMPT: &str = r#"Sen Konya'daki su kullanıcıları için su tasarrufu konusunda uzman bir analistsin.
Kullanıcıların su tüketim verilerini analiz ederek detaylı analiz ve kişiselleştirilmiş öneriler sunuyorsun.
Analizin şunları içermeli: su kullanım puanı (0-100, düşük daha iyi), günlük toplam tüketim (litre),
alışkanlıkları hakkında özel içgörüler ve uygulanabilir öneriler.
Yanıtını aşağıdaki yapıda bir JSON nesnesi olarak formatla:
{
  "waterUsageScore": number,
  "totalLitersPerDay": number,
  "insights": string[],
  "recommendations": string[],
  "comparison": {
    "user": number,
    "cityAverage": number,
    "recommended": number
  },
  "breakdown": [
    {
      "category": string,
      "percentage": number,
      "liters": number
    }
  ]
}"#;

/// User turn embedding the serialized record.
///
/// The owner's id is left out of the message.
pub fn user_message(record: &UsageRecord) -> Result<String> {
    let answers = UsageRecord {
        user_id: None,
        ..record.clone()
    };
    Ok(format!(
        "Konya'da yaşayan bir kullanıcının su kullanım verilerini analiz et: {}",
        serde_json::to_string(&answers)?
    ))
}

/// Extract `choices[0].message.content` from a chat completion body
pub fn completion_content(body: &Value) -> Result<&str> {
    body.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Malformed("completion has no choices[0].message.content".to_string()))
}

/// Parse a chat completion body into a checked [`AnalysisResult`]
pub fn parse_completion(body: &Value) -> Result<AnalysisResult> {
    let content = completion_content(body)?;
    let json = strip_code_fence(content);
    let result: AnalysisResult = serde_json::from_str(json)
        .map_err(|e| Error::Malformed(format!("analysis is not valid JSON: {}", e)))?;
    result.check_shape()?;
    Ok(result)
}

/// Models sometimes wrap the JSON in a ```json fence
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn analysis_json() -> Value {
        json!({
            "waterUsageScore": 72,
            "totalLitersPerDay": 180,
            "insights": ["Duş süreniz uzun"],
            "recommendations": ["Duşu 5 dakikaya indirin"],
            "comparison": {"user": 180, "cityAverage": 165, "recommended": 100},
            "breakdown": [
                {"category": "Duş", "percentage": 60, "liters": 108},
                {"category": "Diğer", "percentage": 40, "liters": 72}
            ]
        })
    }

    fn completion(content: &str) -> Value {
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
    }

    #[test]
    fn test_user_message_embeds_record() {
        let record = UsageRecord {
            name: "Ayşe".to_string(),
            ..UsageRecord::default()
        };
        let message = user_message(&record).unwrap();
        assert!(message.starts_with("Konya'da yaşayan"));
        assert!(message.contains("\"showerDuration\":10"));
        assert!(message.contains("Ayşe"));
    }

    #[test]
    fn test_user_message_omits_owner_id() {
        let record = UsageRecord {
            name: "Ayşe".to_string(),
            user_id: Some("current-user".to_string()),
            ..UsageRecord::default()
        };
        let message = user_message(&record).unwrap();
        assert!(message.contains("Ayşe"));
        assert!(!message.contains("userId"));
        assert!(!message.contains("current-user"));
    }

    #[test]
    fn test_system_prompt_names_every_key() {
        for key in [
            "waterUsageScore",
            "totalLitersPerDay",
            "insights",
            "recommendations",
            "cityAverage",
            "breakdown",
            "liters",
        ] {
            assert!(SYSTEM_PROMPT.contains(key), "missing {}", key);
        }
    }

    #[test]
    fn test_parse_completion() {
        let body = completion(&analysis_json().to_string());
        let result = parse_completion(&body).unwrap();
        assert_eq!(result.water_usage_score, 72.0);
        assert_eq!(result.breakdown.len(), 2);
    }

    #[test]
    fn test_parse_fenced_completion() {
        let content = format!("```json\n{}\n```", analysis_json());
        let result = parse_completion(&completion(&content)).unwrap();
        assert_eq!(result.total_liters_per_day, 180.0);
    }

    #[test]
    fn test_parse_missing_choices() {
        let err = parse_completion(&json!({"error": {"message": "quota"}})).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
        assert!(parse_completion(&json!({"choices": []})).is_err());
    }

    #[test]
    fn test_parse_prose_reply() {
        let err = parse_completion(&completion("Üzgünüm, yardımcı olamam.")).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn test_parse_missing_fields() {
        let mut partial = analysis_json();
        partial.as_object_mut().unwrap().remove("comparison");
        assert!(parse_completion(&completion(&partial.to_string())).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_breakdown() {
        let mut bad = analysis_json();
        bad["breakdown"][1]["percentage"] = json!(10);
        assert!(parse_completion(&completion(&bad.to_string())).is_err());
    }
}
