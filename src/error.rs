use thiserror::Error;

/// Błędy przerywające cały import.
///
/// Odrzucenia pojedynczych wierszy NIE są błędami tego typu — import leci
/// dalej, a powody lądują w `ImportReport`. Tutaj trafiają tylko błędy
/// strukturalne (kształt pliku) i awarie transportu do bazy.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("nieobsługiwany format pliku: {0} (oczekiwano .xlsx lub .csv)")]
    UnsupportedFormat(String),

    #[error("nie można odczytać skoroszytu: {0}")]
    Workbook(#[from] calamine::XlsxError),

    #[error("nie można odczytać pliku CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("plik nie zawiera arkusza z danymi")]
    NoSheet,

    #[error("plik nie zawiera wiersza nagłówka")]
    NoHeader,

    #[error("brak wymaganych kolumn: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("błąd bazy danych: {0}")]
    Database(#[from] sqlx::Error),
}

impl ImportError {
    /// Błąd strukturalny = wina wgranego pliku, nie serwera
    pub fn is_structural(&self) -> bool {
        !matches!(self, ImportError::Database(_))
    }
}
