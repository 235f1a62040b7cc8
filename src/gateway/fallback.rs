//! Demonstration values served in place of failed remote calls
//!
//! Built once and handed out by reference so every fallback is the same
//! value, comparable by equality.

use crate::models::{
    AnalysisResult, BreakdownEntry, Comparison, Reservoir, ReservoirState, ReservoirStatus,
};
use std::sync::OnceLock;

/// Prefix of identifiers handed out when a write could not be stored
pub const FALLBACK_ID_PREFIX: &str = "mock-id-";

/// Analysis shown when the live analysis or its stored copy is unavailable
pub fn fallback_analysis() -> &'static AnalysisResult {
    static ANALYSIS: OnceLock<AnalysisResult> = OnceLock::new();
    ANALYSIS.get_or_init(|| AnalysisResult {
        user_name: Some("Örnek Kullanıcı".to_string()),
        water_usage_score: 65.0,
        total_liters_per_day: 142.0,
        insights: vec![
            "Duş süreniz önerilen 5 dakikadan daha uzun".to_string(),
            "Bulaşık makinesi kullanımınız verimli".to_string(),
            "Yaz ayları dışında bahçe sulama sıklığını azaltmayı düşünün".to_string(),
        ],
        recommendations: vec![
            "Duş süresini 5 dakika azaltarak günde yaklaşık 50 litre tasarruf edin".to_string(),
            "Diş fırçalama sırasında tüketimi azaltmak için su tasarruflu musluklar takın"
                .to_string(),
            "Mümkün olduğunda bahçe sulaması için yağmur suyu toplayın".to_string(),
        ],
        comparison: Comparison {
            user: 142.0,
            city_average: 165.0,
            recommended: 100.0,
        },
        breakdown: vec![
            entry("Duş", 40.0, 57.0),
            entry("Bulaşık Makinesi", 15.0, 21.0),
            entry("Çamaşır Makinesi", 20.0, 28.0),
            entry("Bahçe", 15.0, 21.0),
            entry("Diğer", 10.0, 14.0),
        ],
    })
}

/// Reservoir snapshot shown when `barajData/latest` is unavailable
pub fn fallback_reservoirs() -> &'static ReservoirStatus {
    static RESERVOIRS: OnceLock<ReservoirStatus> = OnceLock::new();
    RESERVOIRS.get_or_init(|| ReservoirStatus {
        reservoirs: vec![
            reservoir("Altınapa Barajı", 15.7, 4.2, 27.0, "Ekim 2025", ReservoirState::Warning),
            reservoir("Apa Barajı", 110.0, 18.7, 17.0, "Ağustos 2025", ReservoirState::Critical),
            reservoir("Bağbaşı Barajı", 35.5, 12.4, 35.0, "Aralık 2025", ReservoirState::Warning),
            reservoir("Beyşehir Gölü", 4150.0, 1660.0, 40.0, "Şubat 2026", ReservoirState::Warning),
            reservoir("Sille Barajı", 12.5, 5.0, 40.0, "Ocak 2026", ReservoirState::Warning),
        ],
        last_updated: "15 Mayıs 2025".to_string(),
        average_percentage: 31.8,
    })
}

/// Time-based placeholder id for a write that did not reach the store
pub fn fallback_record_id() -> String {
    format!(
        "{}{}",
        FALLBACK_ID_PREFIX,
        chrono::Utc::now().timestamp_millis()
    )
}

fn entry(category: &str, percentage: f64, liters: f64) -> BreakdownEntry {
    BreakdownEntry {
        category: category.to_string(),
        percentage,
        liters,
    }
}

fn reservoir(
    name: &str,
    capacity: f64,
    current_level: f64,
    percentage: f64,
    estimated_depletion: &str,
    status: ReservoirState,
) -> Reservoir {
    Reservoir {
        name: name.to_string(),
        capacity,
        current_level,
        percentage,
        estimated_depletion: estimated_depletion.to_string(),
        status,
    }
}
