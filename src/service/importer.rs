use crate::db::queries;
use crate::error::ImportError;
use crate::models::ImportReport;
use crate::service::normalizer;
use sqlx::PgPool;

/// Usługa importu: jeden wgrany plik -> jedno liniowe przejście
/// (parsowanie -> normalizacja/walidacja -> zapis do bazy)
pub struct ImportService {
    pool: PgPool,
}

impl ImportService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn import_file(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> Result<ImportReport, ImportError> {
        tracing::info!("Import \"{}\": {} bajtów", filename, bytes.len());

        // Faza 1: normalizacja. Błąd strukturalny przerywa import zanim
        // cokolwiek trafi do bazy.
        let normalized = normalizer::normalize(filename, bytes)?;
        tracing::info!(
            "Import \"{}\": {} wierszy danych, {} poprawnych, {} odrzuconych przy walidacji",
            filename,
            normalized.total_rows,
            normalized.rows.len(),
            normalized.rejected.len()
        );

        // Faza 2: zapis. Odrzucenia per-wiersz po stronie bazy nie przerywają
        // importu; fatalny błąd połączenia tak.
        let outcome = queries::insert_costs(&self.pool, &normalized.rows).await?;

        let report = ImportReport {
            total_rows: normalized.total_rows,
            inserted: outcome.inserted,
            rejected: normalized.rejected,
            db_failures: outcome.failures,
        };

        tracing::info!(
            "Import \"{}\": zapisano {}/{} wierszy ({} odrzuconych, {} błędów bazy)",
            filename,
            report.inserted,
            report.total_rows,
            report.rejected.len(),
            report.db_failures.len()
        );

        Ok(report)
    }
}
