use std::path::PathBuf;

use csv_core::WriteResult;

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum Format {
    Table,
    Jsonl,
    Csv,
}

#[derive(clap::Parser)]
#[group(id = "output::Args")]
pub struct Args {
    /// Write to this file instead of the terminal.
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
    #[arg(long, short='f', value_enum, default_value_t = Format::Table)]
    format: Format,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("could not open the specified output file at {1:?}")]
    OpenOutputFile(#[source] std::io::Error, PathBuf),
    #[error("could not write data to the output file at {1:?}")]
    WriteFile(#[source] std::io::Error, PathBuf),
    #[error("could not write data to the terminal")]
    WriteStdout(#[source] std::io::Error),
    #[error("could not serialize a record to JSON")]
    SerializeJson(#[source] serde_json::Error),
}

/// Something that can be printed as one row of a table, CSV or a JSON line.
pub trait Record: serde::Serialize {
    fn headers() -> &'static [&'static str];
    fn row(&self) -> Vec<String>;
}

impl Args {
    /// Write out all `records` in the requested format.
    pub fn write_records<R: Record>(
        &self,
        records: impl IntoIterator<Item = R>,
    ) -> Result<(), Error> {
        let mut io = match &self.output {
            None => Box::new(std::io::stdout().lock()) as Box<dyn std::io::Write>,
            Some(path) => Box::new(
                std::fs::OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(path)
                    .map_err(|e| Error::OpenOutputFile(e, path.clone()))?,
            ) as Box<_>,
        };
        let data = render(self.format, records)?;
        io.write_all(&data).map_err(|e| self.write_error(e))?;
        io.flush().map_err(|e| self.write_error(e))
    }

    fn write_error(&self, e: std::io::Error) -> Error {
        match &self.output {
            None => Error::WriteStdout(e),
            Some(p) => Error::WriteFile(e, p.clone()),
        }
    }
}

/// Format `records` into bytes ready to be written out.
pub fn render<R: Record>(
    format: Format,
    records: impl IntoIterator<Item = R>,
) -> Result<Vec<u8>, Error> {
    let mut bytes = Vec::new();
    match format {
        Format::Table => {
            let mut comfy = comfy_table::Table::new();
            comfy
                .set_header(R::headers().to_vec())
                .set_content_arrangement(comfy_table::ContentArrangement::Dynamic);
            for record in records {
                comfy.add_row(record.row());
            }
            bytes.extend(comfy.to_string().into_bytes());
            bytes.push(b'\n');
        }
        Format::Jsonl => {
            for record in records {
                serde_json::to_writer(&mut bytes, &record).map_err(Error::SerializeJson)?;
                bytes.push(b'\n');
            }
        }
        Format::Csv => {
            write_csv_row(&mut bytes, R::headers());
            for record in records {
                write_csv_row(&mut bytes, &record.row());
            }
        }
    }
    Ok(bytes)
}

fn write_csv_row<V: std::ops::Deref<Target = str>>(bytes: &mut Vec<u8>, values: &[V]) {
    // Worst case every byte is a quote that needs escaping, plus the surrounding quotes.
    let max_len = 2 + 2 * values.iter().map(|v| v.len()).max().unwrap_or(0);
    let mut output = vec![0; max_len];
    let mut writer = csv_core::Writer::new();
    for (index, value) in values.iter().enumerate() {
        if index != 0 {
            let (WriteResult::InputEmpty, ob) = writer.delimiter(&mut output) else {
                unreachable!("output buffer fits a delimiter");
            };
            bytes.extend_from_slice(&output[..ob]);
        }
        let (WriteResult::InputEmpty, _, ob) = writer.field(value.as_bytes(), &mut output) else {
            unreachable!("output buffer fits the escaped field");
        };
        bytes.extend_from_slice(&output[..ob]);
    }
    let (WriteResult::InputEmpty, ob) = writer.terminator(&mut output) else {
        unreachable!("output buffer fits a terminator");
    };
    bytes.extend_from_slice(&output[..ob]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize)]
    struct Pair {
        name: &'static str,
        count: u32,
    }

    impl Record for Pair {
        fn headers() -> &'static [&'static str] {
            &["Name", "Count"]
        }
        fn row(&self) -> Vec<String> {
            vec![self.name.to_string(), self.count.to_string()]
        }
    }

    fn pairs() -> [Pair; 2] {
        [Pair { name: "energy.e_dc_total[0]", count: 1 }, Pair { name: "with, comma", count: 2 }]
    }

    #[test]
    fn csv_is_escaped() {
        let csv = String::from_utf8(render(Format::Csv, pairs()).unwrap()).unwrap();
        assert_eq!(csv, "Name,Count\nenergy.e_dc_total[0],1\n\"with, comma\",2\n");
    }

    #[test]
    fn json_lines() {
        let jsonl = String::from_utf8(render(Format::Jsonl, pairs()).unwrap()).unwrap();
        let lines = jsonl.lines().collect::<Vec<_>>();
        assert_eq!(
            lines,
            [
                r#"{"name":"energy.e_dc_total[0]","count":1}"#,
                r#"{"name":"with, comma","count":2}"#,
            ]
        );
    }

    #[test]
    fn table_mentions_every_row() {
        let table = String::from_utf8(render(Format::Table, pairs()).unwrap()).unwrap();
        assert!(table.contains("Count"));
        assert!(table.contains("energy.e_dc_total[0]"));
        assert!(table.contains("with, comma"));
    }
}
