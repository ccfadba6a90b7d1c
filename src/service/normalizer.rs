use crate::error::ImportError;
use crate::models::{CostRecord, NormalizedRow, RejectedRow};
use bigdecimal::BigDecimal;
use calamine::{Data, Reader, Xlsx};
use chrono::NaiveDate;
use indexmap::IndexMap;
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

/// Kolumny kanoniczne rekordu kosztowego
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Data,
    Nazwa,
    Kwota,
    IdOpk,
    NumerDokumentu,
}

impl Column {
    pub const REQUIRED: [Column; 4] = [Column::Data, Column::Nazwa, Column::Kwota, Column::IdOpk];

    pub fn canonical(self) -> &'static str {
        match self {
            Column::Data => "Data",
            Column::Nazwa => "Nazwa",
            Column::Kwota => "Kwota",
            Column::IdOpk => "ID_OPK",
            Column::NumerDokumentu => "Numer_dokumentu",
        }
    }

    /// Dopasowanie nagłówka źródłowego: trim + lowercase, stała tabela wariantów
    fn from_header(header: &str) -> Option<Column> {
        match header.trim().to_lowercase().as_str() {
            "data otrzymania" | "data" => Some(Column::Data),
            "nazwa:towar" | "nazwa" => Some(Column::Nazwa),
            "cena netto [pln]" | "kwota" => Some(Column::Kwota),
            "id opk" | "id_opk" | "idopk" => Some(Column::IdOpk),
            "numer dokumentu" | "numer_dokumentu" => Some(Column::NumerDokumentu),
            _ => None,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

/// Komórka tabeli po sprowadzeniu XLSX i CSV do wspólnej postaci
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

/// Wynik normalizacji: wiersze gotowe do zapisu + odrzucone z powodami
#[derive(Debug, Clone)]
pub struct Normalized {
    pub rows: Vec<NormalizedRow>,
    pub rejected: Vec<RejectedRow>,
    /// Wiersze danych w pliku (bez nagłówka i wierszy całkiem pustych)
    pub total_rows: usize,
}

/// Wybór parsera po rozszerzeniu nazwy pliku
pub fn normalize(filename: &str, bytes: &[u8]) -> Result<Normalized, ImportError> {
    let lower = filename.to_lowercase();
    if lower.ends_with(".xlsx") {
        normalize_xlsx(bytes)
    } else if lower.ends_with(".csv") {
        normalize_csv(bytes)
    } else {
        Err(ImportError::UnsupportedFormat(filename.to_string()))
    }
}

/// Normalizacja pierwszego arkusza skoroszytu XLSX
pub fn normalize_xlsx(bytes: &[u8]) -> Result<Normalized, ImportError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .ok_or(ImportError::NoSheet)?
        .clone();
    let range = workbook.worksheet_range(&sheet_name)?;

    let rows: Vec<Vec<Cell>> = range
        .rows()
        .map(|row| row.iter().map(cell_from_xlsx).collect())
        .collect();

    normalize_table(rows)
}

/// Normalizacja pliku CSV (te same nagłówki i reguły co XLSX)
pub fn normalize_csv(bytes: &[u8]) -> Result<Normalized, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }

    normalize_table(rows)
}

/// Wspólna ścieżka: nagłówek -> mapa kolumn -> walidacja wiersz po wierszu.
/// Kolejność wierszy wyjściowych = kolejność w pliku.
fn normalize_table(rows: Vec<Vec<Cell>>) -> Result<Normalized, ImportError> {
    let Some((header, data)) = rows.split_first() else {
        return Err(ImportError::NoHeader);
    };

    let columns = resolve_header(header)?;

    let mut out = Normalized {
        rows: Vec::new(),
        rejected: Vec::new(),
        total_rows: 0,
    };

    for (idx, cells) in data.iter().enumerate() {
        // Numer wiersza w pliku: nagłówek = 1, pierwszy wiersz danych = 2
        let row_no = idx + 2;

        if cells.iter().all(|c| matches!(c, Cell::Empty)) {
            continue;
        }
        out.total_rows += 1;

        match convert_row(cells, &columns) {
            Ok(record) => out.rows.push(NormalizedRow { row: row_no, record }),
            Err(reason) => out.rejected.push(RejectedRow { row: row_no, reason }),
        }
    }

    Ok(out)
}

/// Mapa kolumna kanoniczna -> indeks w wierszu. Pierwsze wystąpienie wygrywa,
/// nierozpoznane nagłówki są ignorowane. Brak kolumny wymaganej przerywa
/// import zanim przetworzony zostanie jakikolwiek wiersz.
fn resolve_header(header: &[Cell]) -> Result<IndexMap<Column, usize>, ImportError> {
    let mut columns: IndexMap<Column, usize> = IndexMap::new();

    for (idx, cell) in header.iter().enumerate() {
        let name = match cell {
            Cell::Text(s) => s.as_str(),
            _ => continue,
        };
        if let Some(column) = Column::from_header(name) {
            columns.entry(column).or_insert(idx);
        }
    }

    let missing: Vec<String> = Column::REQUIRED
        .iter()
        .filter(|c| !columns.contains_key(*c))
        .map(|c| c.canonical().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ImportError::MissingColumns(missing));
    }

    Ok(columns)
}

fn lookup<'a>(cells: &'a [Cell], columns: &IndexMap<Column, usize>, column: Column) -> &'a Cell {
    columns
        .get(&column)
        .and_then(|&idx| cells.get(idx))
        .unwrap_or(&Cell::Empty)
}

fn convert_row(cells: &[Cell], columns: &IndexMap<Column, usize>) -> Result<CostRecord, String> {
    let data = parse_date(lookup(cells, columns, Column::Data))?;
    let nazwa = cell_text(lookup(cells, columns, Column::Nazwa))
        .ok_or_else(|| missing_value(Column::Nazwa))?;
    let kwota = parse_amount(lookup(cells, columns, Column::Kwota))?;
    let id_opk = cell_text(lookup(cells, columns, Column::IdOpk))
        .ok_or_else(|| missing_value(Column::IdOpk))?;
    let numer_dokumentu = columns
        .get(&Column::NumerDokumentu)
        .and_then(|&idx| cells.get(idx))
        .and_then(cell_text);

    Ok(CostRecord {
        data,
        nazwa,
        kwota,
        id_opk,
        numer_dokumentu,
    })
}

fn missing_value(column: Column) -> String {
    format!("brak wartości w wymaganej kolumnie \"{column}\"")
}

fn cell_from_xlsx(cell: &Data) -> Cell {
    match cell {
        Data::Empty => Cell::Empty,
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.trim().to_string()),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => Cell::Date(ndt.date()),
            None => Cell::Empty,
        },
        Data::DateTimeIso(s) => Cell::Text(s.clone()),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Empty,
    }
}

/// Komórka jako tekst (pola Nazwa, ID_OPK, Numer_dokumentu).
/// Liczbowe ID OPK nie mogą dostać sztucznego ".0".
fn cell_text(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Empty => None,
        Cell::Text(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Cell::Number(f) if f.fract() == 0.0 => Some((*f as i64).to_string()),
        Cell::Number(f) => Some(f.to_string()),
        Cell::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
    }
}

fn parse_date(cell: &Cell) -> Result<NaiveDate, String> {
    match cell {
        Cell::Empty => Err(missing_value(Column::Data)),
        Cell::Date(d) => Ok(*d),
        Cell::Text(s) => {
            let raw = s.trim();
            for format in ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y"] {
                if let Ok(d) = NaiveDate::parse_from_str(raw, format) {
                    return Ok(d);
                }
            }
            Err(format!(
                "nie można zinterpretować \"{raw}\" jako daty (kolumna \"Data\")"
            ))
        }
        Cell::Number(f) => Err(format!(
            "nie można zinterpretować \"{f}\" jako daty (kolumna \"Data\")"
        )),
    }
}

fn parse_amount(cell: &Cell) -> Result<BigDecimal, String> {
    match cell {
        Cell::Empty => Err(missing_value(Column::Kwota)),
        // Komórki liczbowe XLSX przychodzą jako f64 - zaokrąglenie do groszy
        Cell::Number(f) => BigDecimal::try_from(*f)
            .map(|d| d.round(2))
            .map_err(|_| bad_amount(&f.to_string())),
        Cell::Text(s) => {
            // Przecinek dziesiętny i spacje tysięcy (w tym twarda spacja)
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| *c != ' ' && *c != '\u{a0}')
                .map(|c| if c == ',' { '.' } else { c })
                .collect();
            BigDecimal::from_str(&cleaned).map_err(|_| bad_amount(s.trim()))
        }
        Cell::Date(d) => Err(bad_amount(&d.to_string())),
    }
}

fn bad_amount(raw: &str) -> String {
    format!("nie można zinterpretować \"{raw}\" jako kwoty (kolumna \"Kwota\")")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn xlsx_from(rows: &[&[&str]]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                sheet.write_string(r as u32, c as u16, *value).unwrap();
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    fn amount(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn single_valid_row_maps_to_one_record() {
        let bytes = xlsx_from(&[
            &["data otrzymania", "Nazwa:Towar", "Cena netto [PLN]", "ID OPK"],
            &["2024-01-05", "Toner", "120.50", "OPK-01"],
        ]);

        let out = normalize_xlsx(&bytes).unwrap();
        assert_eq!(out.total_rows, 1);
        assert!(out.rejected.is_empty());
        assert_eq!(out.rows.len(), 1);

        let row = &out.rows[0];
        assert_eq!(row.row, 2);
        assert_eq!(
            row.record,
            CostRecord {
                data: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                nazwa: "Toner".to_string(),
                kwota: amount("120.50"),
                id_opk: "OPK-01".to_string(),
                numer_dokumentu: None,
            }
        );
    }

    #[test]
    fn header_matching_is_case_insensitive() {
        let bytes = xlsx_from(&[
            &["DATA OTRZYMANIA", "nazwa:towar", "CENA NETTO [PLN]", "Id Opk"],
            &["2024-02-01", "Papier", "33.00", "OPK-02"],
        ]);

        let out = normalize_xlsx(&bytes).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].record.id_opk, "OPK-02");
    }

    #[test]
    fn short_header_variants_are_accepted() {
        let bytes = xlsx_from(&[
            &["Data", "Nazwa", "Kwota", "id_opk", "Numer dokumentu"],
            &["2024-03-10", "Serwis", "250.00", "OPK-03", "FV/12/2024"],
        ]);

        let out = normalize_xlsx(&bytes).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(
            out.rows[0].record.numer_dokumentu.as_deref(),
            Some("FV/12/2024")
        );
    }

    #[test]
    fn missing_required_column_fails_before_any_row() {
        // Brak kolumny ID OPK - pada cały import, mimo poprawnych wierszy
        let bytes = xlsx_from(&[
            &["Data otrzymania", "Nazwa:Towar", "Cena netto [PLN]"],
            &["2024-01-05", "Toner", "120.50"],
            &["2024-01-06", "Papier", "45.00"],
        ]);

        match normalize_xlsx(&bytes) {
            Err(ImportError::MissingColumns(missing)) => {
                assert_eq!(missing, vec!["ID_OPK".to_string()]);
            }
            other => panic!("oczekiwano MissingColumns, jest: {other:?}"),
        }
    }

    #[test]
    fn bad_amount_rejects_row_but_not_file() {
        let bytes = xlsx_from(&[
            &["Data otrzymania", "Nazwa:Towar", "Cena netto [PLN]", "ID OPK"],
            &["2024-01-05", "Toner", "abc", "OPK-01"],
            &["2024-01-06", "Papier", "45.00", "OPK-01"],
        ]);

        let out = normalize_xlsx(&bytes).unwrap();
        assert_eq!(out.total_rows, 2);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].record.nazwa, "Papier");

        assert_eq!(out.rejected.len(), 1);
        assert_eq!(out.rejected[0].row, 2);
        assert!(out.rejected[0].reason.contains("Kwota"));
        assert!(out.rejected[0].reason.contains("abc"));
    }

    #[test]
    fn bad_date_rejects_row() {
        let bytes = xlsx_from(&[
            &["Data otrzymania", "Nazwa:Towar", "Cena netto [PLN]", "ID OPK"],
            &["wczoraj", "Toner", "120.50", "OPK-01"],
        ]);

        let out = normalize_xlsx(&bytes).unwrap();
        assert!(out.rows.is_empty());
        assert_eq!(out.rejected.len(), 1);
        assert!(out.rejected[0].reason.contains("Data"));
    }

    #[test]
    fn missing_required_value_rejects_row() {
        let bytes = xlsx_from(&[
            &["Data otrzymania", "Nazwa:Towar", "Cena netto [PLN]", "ID OPK"],
            &["2024-01-05", "", "120.50", "OPK-01"],
        ]);

        let out = normalize_xlsx(&bytes).unwrap();
        assert!(out.rows.is_empty());
        assert_eq!(out.rejected.len(), 1);
        assert!(out.rejected[0].reason.contains("Nazwa"));
    }

    #[test]
    fn row_order_is_preserved() {
        let bytes = xlsx_from(&[
            &["Data", "Nazwa", "Kwota", "ID OPK"],
            &["2024-01-03", "C", "3.00", "OPK-01"],
            &["2024-01-01", "A", "1.00", "OPK-01"],
            &["2024-01-02", "B", "2.00", "OPK-01"],
        ]);

        let out = normalize_xlsx(&bytes).unwrap();
        let names: Vec<&str> = out.rows.iter().map(|r| r.record.nazwa.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
        let rows: Vec<usize> = out.rows.iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![2, 3, 4]);
    }

    #[test]
    fn blank_rows_are_skipped_silently() {
        let bytes = xlsx_from(&[
            &["Data", "Nazwa", "Kwota", "ID OPK"],
            &["2024-01-01", "A", "1.00", "OPK-01"],
            &["", "", "", ""],
            &["2024-01-02", "B", "2.00", "OPK-01"],
        ]);

        let out = normalize_xlsx(&bytes).unwrap();
        assert_eq!(out.total_rows, 2);
        assert_eq!(out.rows.len(), 2);
        assert!(out.rejected.is_empty());
    }

    #[test]
    fn unrecognized_columns_are_ignored() {
        let bytes = xlsx_from(&[
            &["Data", "Uwagi", "Nazwa", "Kwota", "ID OPK"],
            &["2024-01-01", "pilne", "A", "1.00", "OPK-01"],
        ]);

        let out = normalize_xlsx(&bytes).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].record.nazwa, "A");
    }

    #[test]
    fn polish_decimal_comma_and_dmy_date() {
        let bytes = xlsx_from(&[
            &["Data otrzymania", "Nazwa:Towar", "Cena netto [PLN]", "ID OPK"],
            &["05.01.2024", "Toner", "1 120,50", "OPK-01"],
        ]);

        let out = normalize_xlsx(&bytes).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(
            out.rows[0].record.data,
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
        );
        assert_eq!(out.rows[0].record.kwota, amount("1120.50"));
    }

    #[test]
    fn numeric_cells_round_to_grosze_and_ids_stay_integral() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (c, name) in ["Data", "Nazwa", "Kwota", "ID OPK"].iter().enumerate() {
            sheet.write_string(0, c as u16, *name).unwrap();
        }
        sheet.write_string(1, 0, "2024-01-05").unwrap();
        sheet.write_string(1, 1, "Toner").unwrap();
        sheet.write_number(1, 2, 120.5).unwrap();
        sheet.write_number(1, 3, 501.0).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let out = normalize_xlsx(&bytes).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].record.kwota, amount("120.50"));
        assert_eq!(out.rows[0].record.id_opk, "501");
    }

    #[test]
    fn csv_goes_through_the_same_rules() {
        let csv = "Data otrzymania,Nazwa:Towar,Cena netto [PLN],ID OPK,Numer dokumentu\n\
                   2024-01-05,Toner,120.50,OPK-01,FV/1/2024\n\
                   2024-01-06,Papier,abc,OPK-02,\n";

        let out = normalize_csv(csv.as_bytes()).unwrap();
        assert_eq!(out.total_rows, 2);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].record.numer_dokumentu.as_deref(), Some("FV/1/2024"));
        assert_eq!(out.rejected.len(), 1);
        assert_eq!(out.rejected[0].row, 3);
        assert!(out.rejected[0].reason.contains("Kwota"));
    }

    #[test]
    fn csv_missing_column_is_structural() {
        let csv = "Nazwa,Kwota,ID OPK\nToner,120.50,OPK-01\n";
        match normalize_csv(csv.as_bytes()) {
            Err(ImportError::MissingColumns(missing)) => {
                assert_eq!(missing, vec!["Data".to_string()]);
            }
            other => panic!("oczekiwano MissingColumns, jest: {other:?}"),
        }
    }

    #[test]
    fn extension_dispatch() {
        assert!(matches!(
            normalize("koszty.pdf", b""),
            Err(ImportError::UnsupportedFormat(_))
        ));
        let csv = "Data,Nazwa,Kwota,ID OPK\n2024-01-01,A,1.00,OPK-01\n";
        let out = normalize("Koszty.CSV", csv.as_bytes()).unwrap();
        assert_eq!(out.rows.len(), 1);
    }

    #[test]
    fn empty_file_has_no_header() {
        assert!(matches!(
            normalize_csv(b""),
            Err(ImportError::NoHeader)
        ));
    }
}
