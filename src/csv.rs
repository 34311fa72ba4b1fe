use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::{CardSnapshot, CardStatus};
use crate::model::{AuthResponse, AuthorizationRecord, CardId, LeaseId, ProviderId};
use crate::Amount;

/// Errors that can occur when reading or writing csv files
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("failed to open {path}: {source}")]
    Open { path: String, source: csv::Error },

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: invalid {field} '{value}'")]
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("failed to write row: {0}")]
    Write(#[from] csv::Error),

    #[error("failed to flush output: {0}")]
    Flush(#[from] io::Error),
}

#[derive(Debug, Deserialize)]
struct CardRow {
    card_id: CardId,
    lease_id: LeaseId,
    reference_id: String,
    provider_id: ProviderId,
    product_type: String,
    status: CardStatus,
    available_balance: String,
    card_balance: String,
    original_card_base_amount: String,
    max_amount_less: String,
    active_to_date: DateTime<Utc>,
    expiration_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct AuthorizationRow {
    reference_id: String,
    network_auth_id: String,
    r#type: String,
    amount: String,
    response: String,
    date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct CardOutputRow<'a> {
    card_id: CardId,
    lease_id: LeaseId,
    status: CardStatus,
    available: String,
    balance: String,
    reference_id: &'a str,
}

fn amount(line: usize, field: &'static str, value: &str) -> Result<Amount, CsvError> {
    value.parse().map_err(|_| CsvError::InvalidField {
        line,
        field,
        value: value.to_string(),
    })
}

fn open(path: &Path) -> Result<csv::Reader<std::fs::File>, CsvError> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| CsvError::Open {
            path: path.display().to_string(),
            source,
        })
}

/// Read card snapshots from a csv file
pub fn read_cards(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<CardSnapshot, CsvError>>, CsvError> {
    let reader = open(path.as_ref())?;

    Ok(reader
        .into_deserialize::<CardRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            Ok(CardSnapshot {
                card_id: row.card_id,
                lease_id: row.lease_id,
                reference_id: row.reference_id,
                provider_id: row.provider_id,
                product_type: row.product_type,
                status: row.status,
                available_balance: amount(line, "available_balance", &row.available_balance)?,
                card_balance: amount(line, "card_balance", &row.card_balance)?,
                original_card_base_amount: amount(
                    line,
                    "original_card_base_amount",
                    &row.original_card_base_amount,
                )?,
                max_amount_less: amount(line, "max_amount_less", &row.max_amount_less)?,
                active_to_date: row.active_to_date,
                expiration_date: row.expiration_date,
                version: 0,
            })
        }))
}

/// Read provider-confirmed authorizations from a csv file
pub fn read_authorizations(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<AuthorizationRecord, CsvError>>, CsvError> {
    let reader = open(path.as_ref())?;

    Ok(reader
        .into_deserialize::<AuthorizationRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2;
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            let response = match row.response.to_ascii_uppercase().as_str() {
                "APPROVAL" => AuthResponse::Approval,
                "DECLINE" => AuthResponse::Decline,
                _ => {
                    return Err(CsvError::InvalidField {
                        line,
                        field: "response",
                        value: row.response,
                    });
                }
            };
            let amount = amount(line, "amount", &row.amount)?;
            if amount < Amount::ZERO {
                return Err(CsvError::InvalidField {
                    line,
                    field: "amount",
                    value: row.amount,
                });
            }
            Ok(AuthorizationRecord {
                reference_id: row.reference_id,
                network_auth_id: row.network_auth_id,
                transaction_type: row.r#type,
                amount,
                response,
                transaction_date: row.date,
            })
        }))
}

/// Write card balances in csv format
pub fn write_cards<'a>(
    cards: impl IntoIterator<Item = &'a CardSnapshot>,
    out: impl io::Write,
) -> Result<(), CsvError> {
    let mut writer = csv::Writer::from_writer(out);

    for card in cards {
        writer.serialize(CardOutputRow {
            card_id: card.card_id,
            lease_id: card.lease_id,
            status: card.status,
            available: card.available_balance.to_string(),
            balance: card.card_balance.to_string(),
            reference_id: &card.reference_id,
        })?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CARD_HEADER: &str = "card_id,lease_id,reference_id,provider_id,product_type,status,available_balance,card_balance,original_card_base_amount,max_amount_less,active_to_date,expiration_date\n";
    const AUTH_HEADER: &str = "reference_id,network_auth_id,type,amount,response,date\n";

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn read_card() {
        let file = write_csv(&format!(
            "{CARD_HEADER}1,100,ref-1,7,VIRTUAL,Open,1000.00,0,1000.00,100.00,2030-01-01T00:00:00Z,2031-01-01T00:00:00Z\n"
        ));
        let cards: Vec<_> = read_cards(file.path()).unwrap().collect();
        assert_eq!(cards.len(), 1);

        let card = cards.into_iter().next().unwrap().unwrap();
        assert_eq!(card.card_id, 1);
        assert_eq!(card.reference_id, "ref-1");
        assert_eq!(card.status, CardStatus::Open);
        assert_eq!(card.available_balance, Amount::from_cents(100_000));
        assert_eq!(card.max_amount_less, Amount::from_cents(10_000));
        assert_eq!(card.version, 0);
    }

    #[test]
    fn read_card_with_invalid_amount() {
        let file = write_csv(&format!(
            "{CARD_HEADER}1,100,ref-1,7,VIRTUAL,Open,lots,0,1000.00,100.00,2030-01-01T00:00:00Z,2031-01-01T00:00:00Z\n"
        ));
        let cards: Vec<_> = read_cards(file.path()).unwrap().collect();
        assert!(matches!(
            cards[0],
            Err(CsvError::InvalidField {
                line: 2,
                field: "available_balance",
                ..
            })
        ));
    }

    #[test]
    fn read_authorization_with_whitespace() {
        let file = write_csv(&format!(
            "{AUTH_HEADER}ref-1, a1, AUTHORIZATION.REVERSAL, 25.50, approval, 2030-01-01T00:00:00Z\n"
        ));
        let records: Vec<_> = read_authorizations(file.path()).unwrap().collect();
        let record = records.into_iter().next().unwrap().unwrap();
        assert_eq!(record.network_auth_id, "a1");
        assert_eq!(record.amount, Amount::from_cents(2_550));
        assert_eq!(record.response, AuthResponse::Approval);
        assert_eq!(record.transaction_type, "AUTHORIZATION.REVERSAL");
    }

    #[test]
    fn read_authorization_rejects_unknown_response() {
        let file = write_csv(&format!(
            "{AUTH_HEADER}ref-1,a1,AUTHORIZATION,25.50,maybe,2030-01-01T00:00:00Z\n"
        ));
        let records: Vec<_> = read_authorizations(file.path()).unwrap().collect();
        assert!(matches!(
            records[0],
            Err(CsvError::InvalidField {
                line: 2,
                field: "response",
                ..
            })
        ));
    }

    #[test]
    fn read_authorization_rejects_negative_amount() {
        let file = write_csv(&format!(
            "{AUTH_HEADER}ref-1,a1,AUTHORIZATION,-1,APPROVAL,2030-01-01T00:00:00Z\n"
        ));
        let records: Vec<_> = read_authorizations(file.path()).unwrap().collect();
        assert!(matches!(
            records[0],
            Err(CsvError::InvalidField { field: "amount", .. })
        ));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(matches!(
            read_authorizations("does/not/exist.csv"),
            Err(CsvError::Open { .. })
        ));
    }

    #[test]
    fn write_card_rows() {
        let file = write_csv(&format!(
            "{CARD_HEADER}1,100,ref-1,7,VIRTUAL,Authorized,750,250,1000.00,100.00,2030-01-01T00:00:00Z,2031-01-01T00:00:00Z\n"
        ));
        let cards: Vec<_> = read_cards(file.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        let mut out = Vec::new();
        write_cards(&cards, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "card_id,lease_id,status,available,balance,reference_id\n1,100,Authorized,750.00,250.00,ref-1\n"
        );
    }
}
