use crate::cmd::config::CmdError;

use regdiag_core::{FeatureMatrix, SyntheticData, TargetVector};

use nalgebra::{DMatrix, DVector};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Numeric CSV with a header row.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

pub fn mk_rdr<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

pub fn read_table<P: AsRef<Path>>(path: P) -> Result<Table, CmdError> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| CmdError::Msg(format!("could not open {}: {}", path.display(), e)))?;
    let table = read_table_from(file)?;
    log::info!(
        "read {} rows x {} columns from {}",
        table.rows.len(),
        table.headers.len(),
        path.display()
    );
    Ok(table)
}

pub fn read_table_from<R: Read>(reader: R) -> Result<Table, CmdError> {
    let mut rdr = mk_rdr(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for (i, r) in rdr.records().enumerate() {
        let record = r?;
        let row = record
            .iter()
            .enumerate()
            .map(|(col, field)| {
                field.parse::<f64>().map_err(|_| {
                    // +2: header line and 1-based numbering
                    CmdError::Msg(format!(
                        "line {}: column '{}' is not a number: '{}'",
                        i + 2,
                        headers.get(col).map_or("?", String::as_str),
                        field
                    ))
                })
            })
            .collect::<Result<Vec<f64>, CmdError>>()?;
        rows.push(row);
    }
    Ok(Table { headers, rows })
}

impl Table {
    pub fn column_index(&self, name: &str) -> Result<usize, CmdError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| CmdError::Msg(format!("no column named '{}'", name)))
    }

    /// Splits off the target column (the last one unless named). Returns the
    /// remaining columns as features together with their names.
    pub fn split_target(
        &self,
        target: Option<&str>,
    ) -> Result<(FeatureMatrix, TargetVector, Vec<String>), CmdError> {
        if self.headers.is_empty() {
            return Err(CmdError::Msg("table has no columns".into()));
        }
        let target_idx = match target {
            Some(name) => self.column_index(name)?,
            None => self.headers.len() - 1,
        };
        let feature_idx: Vec<usize> =
            (0..self.headers.len()).filter(|&c| c != target_idx).collect();
        let names = feature_idx.iter().map(|&c| self.headers[c].clone()).collect();

        let x = self.select(&feature_idx);
        let y = DVector::from_iterator(self.rows.len(), self.rows.iter().map(|r| r[target_idx]));
        Ok((x, y, names))
    }

    /// Feature matrix made of the named columns, in the given order.
    pub fn features(&self, names: &[String]) -> Result<FeatureMatrix, CmdError> {
        let idx = names.iter().map(|n| self.column_index(n)).collect::<Result<Vec<_>, _>>()?;
        Ok(self.select(&idx))
    }

    fn select(&self, columns: &[usize]) -> FeatureMatrix {
        DMatrix::from_fn(self.rows.len(), columns.len(), |i, j| self.rows[i][columns[j]])
    }
}

pub fn write_synthetic<W: Write>(data: &SyntheticData, writer: W) -> Result<(), CmdError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header: Vec<String> = (1..=data.n_features()).map(|j| format!("x{j}")).collect();
    header.push("y".to_string());
    wtr.write_record(&header)?;

    for i in 0..data.n_samples() {
        let mut record: Vec<String> = data.x.row(i).iter().map(|v| v.to_string()).collect();
        record.push(data.y[i].to_string());
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}
