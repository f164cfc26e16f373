use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::money::Money;
use crate::replay::Operation;

/// Errors that can occur when parsing csv rows
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized operation type '{op_type}'")]
    UnrecognizedType { line: usize, op_type: String },

    #[error("line {line}: {op_type} missing {field}")]
    MissingField {
        line: usize,
        op_type: String,
        field: &'static str,
    },
}

#[derive(Debug, Deserialize)]
struct InputRow {
    r#type: String,
    client: String,
    op: u64,
    amount: Option<Decimal>,
    fee: Option<Decimal>,
    target: Option<u64>,
    actor: Option<String>,
    supplier: Option<String>,
    method: Option<String>,
    note: Option<String>,
}

impl InputRow {
    fn amount(&self, line: usize) -> Result<Decimal, CsvError> {
        self.amount.ok_or_else(|| self.missing(line, "amount"))
    }

    fn fee(&self, line: usize) -> Result<Decimal, CsvError> {
        self.fee.ok_or_else(|| self.missing(line, "fee"))
    }

    fn target(&self, line: usize) -> Result<u64, CsvError> {
        self.target.ok_or_else(|| self.missing(line, "target"))
    }

    fn actor(&self, line: usize) -> Result<String, CsvError> {
        self.actor.clone().ok_or_else(|| self.missing(line, "actor"))
    }

    fn supplier(&self, line: usize) -> Result<String, CsvError> {
        self.supplier
            .clone()
            .ok_or_else(|| self.missing(line, "supplier"))
    }

    fn method(&self, line: usize) -> Result<String, CsvError> {
        self.method
            .clone()
            .ok_or_else(|| self.missing(line, "method"))
    }

    fn note_or_default(&self) -> String {
        self.note.clone().unwrap_or_default()
    }

    fn reason_or_default(&self) -> String {
        self.note
            .clone()
            .unwrap_or_else(|| "not specified".to_string())
    }

    fn missing(&self, line: usize, field: &'static str) -> CsvError {
        CsvError::MissingField {
            line,
            op_type: self.r#type.clone(),
            field,
        }
    }
}

#[derive(Debug, Serialize)]
struct OutputRow {
    client: String,
    balance: String,
    available: String,
    pending: String,
}

/// Read wallet operations from a csv file
pub fn read_operations(
    path: impl AsRef<Path>,
) -> impl Iterator<Item = Result<Operation, CsvError>> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .expect("failed to open csv file");

    reader
        .into_deserialize::<InputRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            let client = row.client.clone();
            let op = row.op;
            match row.r#type.as_str() {
                "deposit" => Ok(Operation::Deposit {
                    client,
                    op,
                    amount: row.amount(line)?,
                    reference: row.note.clone(),
                }),
                "approve" => Ok(Operation::Approve {
                    client,
                    op,
                    target: row.target(line)?,
                    actor: row.actor(line)?,
                }),
                "reject" => Ok(Operation::Reject {
                    client,
                    op,
                    target: row.target(line)?,
                    actor: row.actor(line)?,
                    reason: row.reason_or_default(),
                }),
                "withdraw" => Ok(Operation::Withdraw {
                    client,
                    op,
                    amount: row.amount(line)?,
                    note: row.note.clone(),
                }),
                "purchase" => Ok(Operation::Purchase {
                    client,
                    op,
                    amount: row.amount(line)?,
                    supplier: row.supplier(line)?,
                    note: row.note_or_default(),
                }),
                "fee" => Ok(Operation::ServiceFee {
                    client,
                    op,
                    amount: row.amount(line)?,
                    note: row.note_or_default(),
                }),
                "reserve" => Ok(Operation::Reserve {
                    client,
                    op,
                    amount: row.amount(line)?,
                    fee: row.fee(line)?,
                    supplier: row.supplier(line)?,
                    method: row.method(line)?,
                    note: row.note_or_default(),
                }),
                "complete" => Ok(Operation::Complete {
                    client,
                    op,
                    target: row.target(line)?,
                    actor: row.actor(line)?,
                }),
                "cancel" => Ok(Operation::Cancel {
                    client,
                    op,
                    target: row.target(line)?,
                    actor: row.actor(line)?,
                    reason: row.reason_or_default(),
                }),
                other => Err(CsvError::UnrecognizedType {
                    line,
                    op_type: other.to_string(),
                }),
            }
        })
}

/// Format an amount at its currency's scale, without the currency code.
fn plain(money: Money) -> String {
    format!(
        "{:.prec$}",
        money.amount(),
        prec = money.currency().decimal_places() as usize
    )
}

/// Write the final wallet balances to stdout in csv format
pub fn write_balances(rows: impl IntoIterator<Item = (String, Money, Money, Money)>) {
    let stdout = io::stdout();
    let mut writer = csv::Writer::from_writer(stdout.lock());

    for (client, balance, available, pending) in rows {
        let row = OutputRow {
            client,
            balance: plain(balance),
            available: plain(available),
            pending: plain(pending),
        };
        writer.serialize(&row).expect("failed to write csv row");
    }

    writer.flush().expect("failed to flush csv writer");
}
