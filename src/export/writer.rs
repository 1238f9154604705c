//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Zixport.
//! The Zixport project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Table Writer Module
//!
//! Materializes a projected, sanitized table into bytes. The table is built
//! independently of the output format, so every format shares the same
//! projection and sanitization.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Supported output data formats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZiOutputFormat {
    /// Comma-separated values with a header row (RFC 4180 quoting).
    #[default]
    Csv,
    /// Line-delimited JSON: a header array, then one array of cells per row.
    Jsonl,
}

impl ZiOutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ZiOutputFormat::Csv => "csv",
            ZiOutputFormat::Jsonl => "jsonl",
        }
    }
}

/// A fully materialized export: header labels plus sanitized rows.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZiTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ZiTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.headers.len());
        self.rows.push(row);
    }
}

/// Serializes [`ZiTable`]s in one output format.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZiTableWriter {
    format: ZiOutputFormat,
}

impl ZiTableWriter {
    pub fn new(format: ZiOutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> ZiOutputFormat {
        self.format
    }

    /// Renders the whole table into memory.
    pub fn render(&self, table: &ZiTable) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.write_to(table, &mut buffer)?;
        Ok(buffer)
    }

    pub fn write_to<W: Write>(&self, table: &ZiTable, writer: W) -> Result<()> {
        match self.format {
            ZiOutputFormat::Csv => self.write_csv(table, writer),
            ZiOutputFormat::Jsonl => self.write_jsonl(table, writer),
        }
    }

    /// Writes records in CSV format. The header row is always written.
    fn write_csv<W: Write>(&self, table: &ZiTable, writer: W) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .flexible(false)
            .from_writer(writer);

        csv_writer.write_record(&table.headers)?;
        for row in &table.rows {
            csv_writer.write_record(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Writes records in JSONL format (one JSON array per line).
    fn write_jsonl<W: Write>(&self, table: &ZiTable, mut writer: W) -> Result<()> {
        serde_json::to_writer(&mut writer, &table.headers)?;
        writer.write_all(b"\n")?;
        for row in &table.rows {
            serde_json::to_writer(&mut writer, row)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}
