//! Flat tabular form of a grid and its CSV persistence
//!
//! The cell table has one row per cell with columns `row`, `col`, `cost`,
//! `specie 0` .. `specie {N-1}`. The threshold table has a single `thr`
//! column whose row position is the species index. A leading unnamed index
//! column, as written by dataframe tools, is accepted and ignored on input.

use std::io::{Read, Write};
use std::path::Path;

use crate::error::{GridError, GridResult};

pub fn species_column(index: usize) -> String {
    format!("specie {index}")
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellRecord {
    pub row: usize,
    pub col: usize,
    pub cost: f64,
    pub species: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellTable {
    pub species_count: usize,
    pub rows: Vec<CellRecord>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThresholdTable {
    pub values: Vec<f64>,
}

/// Column positions resolved from a header row
struct CellLayout {
    row: usize,
    col: usize,
    cost: usize,
    species: Vec<usize>,
}

fn is_index_column(name: &str) -> bool {
    name.is_empty() || name.starts_with("Unnamed")
}

impl CellLayout {
    fn from_headers(headers: &csv::StringRecord) -> GridResult<Self> {
        let (mut row, mut col, mut cost) = (None, None, None);
        let mut species: Vec<(usize, usize)> = Vec::new();
        for (position, name) in headers.iter().enumerate() {
            let name = name.trim();
            match name {
                "row" => row = Some(position),
                "col" => col = Some(position),
                "cost" => cost = Some(position),
                _ => {
                    if let Some(index) = name.strip_prefix("specie ") {
                        let index = index.trim().parse::<usize>().map_err(|_| {
                            GridError::MalformedInput(format!("bad species column '{name}'"))
                        })?;
                        species.push((index, position));
                    } else if !is_index_column(name) {
                        return Err(GridError::MalformedInput(format!(
                            "unexpected column '{name}'"
                        )));
                    }
                }
            }
        }

        let missing = |label: &str| GridError::MalformedInput(format!("missing '{label}' column"));
        species.sort_unstable();
        for (expected, (index, _)) in species.iter().enumerate() {
            if *index != expected {
                return Err(missing(&species_column(expected)));
            }
        }

        Ok(Self {
            row: row.ok_or_else(|| missing("row"))?,
            col: col.ok_or_else(|| missing("col"))?,
            cost: cost.ok_or_else(|| missing("cost"))?,
            species: species.into_iter().map(|(_, position)| position).collect(),
        })
    }
}

fn field<'r>(record: &'r csv::StringRecord, position: usize, line: usize) -> GridResult<&'r str> {
    record.get(position).map(str::trim).ok_or_else(|| {
        GridError::MalformedInput(format!("line {line}: missing field {position}"))
    })
}

fn parse<T: std::str::FromStr>(value: &str, label: &str, line: usize) -> GridResult<T> {
    value
        .parse::<T>()
        .map_err(|_| GridError::MalformedInput(format!("line {line}: bad {label} '{value}'")))
}

impl CellTable {
    pub fn header(&self) -> Vec<String> {
        let mut header = vec!["row".to_string(), "col".to_string(), "cost".to_string()];
        header.extend((0..self.species_count).map(species_column));
        header
    }

    pub fn from_reader<R: Read>(reader: R) -> GridResult<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let layout = CellLayout::from_headers(reader.headers()?)?;
        let mut rows = Vec::new();
        for (offset, record) in reader.records().enumerate() {
            let record = record?;
            let line = offset + 2;
            let species = layout
                .species
                .iter()
                .enumerate()
                .map(|(index, &position)| {
                    parse::<u32>(field(&record, position, line)?, &species_column(index), line)
                })
                .collect::<GridResult<Vec<_>>>()?;
            rows.push(CellRecord {
                row: parse(field(&record, layout.row, line)?, "row", line)?,
                col: parse(field(&record, layout.col, line)?, "col", line)?,
                cost: parse(field(&record, layout.cost, line)?, "cost", line)?,
                species,
            });
        }
        Ok(Self {
            species_count: layout.species.len(),
            rows,
        })
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> GridResult<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.header())?;
        for record in &self.rows {
            let mut fields = vec![
                record.row.to_string(),
                record.col.to_string(),
                record.cost.to_string(),
            ];
            fields.extend(record.species.iter().map(u32::to_string));
            writer.write_record(&fields)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read_csv(path: impl AsRef<Path>) -> GridResult<Self> {
        Self::from_reader(std::fs::File::open(path)?)
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> GridResult<()> {
        self.to_writer(std::fs::File::create(path)?)
    }
}

impl ThresholdTable {
    pub fn from_reader<R: Read>(reader: R) -> GridResult<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let position = reader
            .headers()?
            .iter()
            .position(|name| name.trim() == "thr")
            .ok_or_else(|| GridError::MalformedInput("missing 'thr' column".into()))?;
        let mut values = Vec::new();
        for (offset, record) in reader.records().enumerate() {
            let record = record?;
            let line = offset + 2;
            values.push(parse(field(&record, position, line)?, "thr", line)?);
        }
        Ok(Self { values })
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> GridResult<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(["thr"])?;
        for value in &self.values {
            writer.write_record([value.to_string()])?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read_csv(path: impl AsRef<Path>) -> GridResult<Self> {
        Self::from_reader(std::fs::File::open(path)?)
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> GridResult<()> {
        self.to_writer(std::fs::File::create(path)?)
    }
}
