use crate::models::{FailedInsert, NormalizedRow};
use sqlx::PgPool;
use std::time::Duration;

const CHUNK_SIZE: usize = 1000;
const INSERT_TIMEOUT: Duration = Duration::from_secs(30);

/// Wynik zapisu: ile wierszy weszło + wiersze odrzucone przez bazę
#[derive(Debug, Default)]
pub struct InsertOutcome {
    pub inserted: usize,
    pub failures: Vec<FailedInsert>,
}

/// Zapis znormalizowanych wierszy do tabeli costs, paczkami po 1000.
///
/// Błąd zgłoszony przez bazę dla paczki (np. naruszenie ograniczenia) nie
/// przerywa importu: paczka jest ponawiana wiersz po wierszu, a winne wiersze
/// lądują w `failures`. Błąd transportowy (utrata połączenia, timeout puli)
/// jest fatalny i przerywa pozostałe zapisy.
pub async fn insert_costs(
    pool: &PgPool,
    rows: &[NormalizedRow],
) -> Result<InsertOutcome, sqlx::Error> {
    let mut outcome = InsertOutcome::default();
    if rows.is_empty() {
        return Ok(outcome);
    }

    for chunk in rows.chunks(CHUNK_SIZE) {
        match insert_chunk(pool, chunk).await {
            Ok(affected) => outcome.inserted += affected as usize,
            Err(sqlx::Error::Database(db_err)) => {
                tracing::warn!(
                    "Batch insert of {} rows rejected ({}), retrying row by row",
                    chunk.len(),
                    db_err.message()
                );
                insert_one_by_one(pool, chunk, &mut outcome).await?;
            }
            Err(e) => {
                tracing::error!("Batch insert failed fatally: {e}");
                return Err(e);
            }
        }
    }

    Ok(outcome)
}

/// Jedna paczka jednym INSERT-em (multi-row VALUES), z limitem czasu 30s
async fn insert_chunk(pool: &PgPool, rows: &[NormalizedRow]) -> Result<u64, sqlx::Error> {
    let mut query_builder = sqlx::QueryBuilder::new(
        r#"INSERT INTO costs ("Data", "Nazwa", "Kwota", "ID_OPK", "Numer_dokumentu") "#,
    );

    query_builder.push_values(rows, |mut b, row| {
        b.push_bind(row.record.data)
            .push_bind(&row.record.nazwa)
            .push_bind(row.record.kwota.clone())
            .push_bind(&row.record.id_opk)
            .push_bind(row.record.numer_dokumentu.clone());
    });

    let execute_result = tokio::time::timeout(
        INSERT_TIMEOUT,
        query_builder.build().execute(pool),
    )
    .await;

    match execute_result {
        Ok(Ok(result)) => {
            tracing::debug!("Inserted {} rows in one batch", result.rows_affected());
            Ok(result.rows_affected())
        }
        Ok(Err(e)) => Err(e),
        Err(_) => {
            tracing::error!("Batch insert timed out (>{INSERT_TIMEOUT:?})");
            Err(sqlx::Error::PoolTimedOut)
        }
    }
}

/// Ścieżka awaryjna: wiersz po wierszu, żeby przypisać błąd bazy do
/// konkretnego numeru wiersza pliku
async fn insert_one_by_one(
    pool: &PgPool,
    rows: &[NormalizedRow],
    outcome: &mut InsertOutcome,
) -> Result<(), sqlx::Error> {
    for row in rows {
        let result = sqlx::query(
            r#"
            INSERT INTO costs ("Data", "Nazwa", "Kwota", "ID_OPK", "Numer_dokumentu")
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(row.record.data)
        .bind(&row.record.nazwa)
        .bind(row.record.kwota.clone())
        .bind(&row.record.id_opk)
        .bind(row.record.numer_dokumentu.clone())
        .execute(pool)
        .await;

        match result {
            Ok(_) => outcome.inserted += 1,
            Err(sqlx::Error::Database(db_err)) => outcome.failures.push(FailedInsert {
                row: row.row,
                reason: db_err.message().to_string(),
            }),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
