use serde::{Deserialize, Serialize};

/// Wiersz odrzucony podczas normalizacji (walidacja typów / brak wartości)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRow {
    /// Numer wiersza w pliku źródłowym (1-based, nagłówek = wiersz 1)
    pub row: usize,
    pub reason: String,
}

/// Wiersz odrzucony przez bazę danych (np. naruszenie ograniczenia)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedInsert {
    pub row: usize,
    pub reason: String,
}

/// Wynik pojedynczego importu: ile wierszy weszło, które odpadły i dlaczego
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    /// Liczba wierszy danych w pliku (bez nagłówka, bez wierszy całkiem pustych)
    pub total_rows: usize,
    pub inserted: usize,
    pub rejected: Vec<RejectedRow>,
    pub db_failures: Vec<FailedInsert>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.db_failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_json_shape() {
        let report = ImportReport {
            total_rows: 3,
            inserted: 2,
            rejected: vec![RejectedRow {
                row: 4,
                reason: "nie można zinterpretować \"abc\" jako kwoty (kolumna \"Kwota\")"
                    .to_string(),
            }],
            db_failures: vec![],
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["total_rows"], 3);
        assert_eq!(json["inserted"], 2);
        assert_eq!(json["rejected"][0]["row"], 4);
        assert!(json["rejected"][0]["reason"]
            .as_str()
            .unwrap()
            .contains("Kwota"));
        assert_eq!(json["db_failures"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn clean_report() {
        let report = ImportReport {
            total_rows: 1,
            inserted: 1,
            rejected: vec![],
            db_failures: vec![],
        };
        assert!(report.is_clean());
    }
}
