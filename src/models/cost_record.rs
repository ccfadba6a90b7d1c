use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Jeden znormalizowany rekord kosztowy (tabela costs)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub data: NaiveDate,
    pub nazwa: String,
    pub kwota: BigDecimal,
    pub id_opk: String,
    pub numer_dokumentu: Option<String>,
}

/// Rekord wraz z numerem wiersza w pliku źródłowym (1-based, nagłówek = wiersz 1).
/// Numer towarzyszy rekordowi aż do zapisu, żeby błędy bazy dało się
/// zaraportować względem wgranego pliku.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRow {
    pub row: usize,
    pub record: CostRecord,
}
