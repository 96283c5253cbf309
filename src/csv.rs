use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::allocator::PanelOccupancy;
use crate::{ClientId, Command, Credential, OwnerId, PanelId, SlotCategory};

/// Errors that can occur when reading or writing csv
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("failed to open {path}: {source}")]
    Open { path: String, source: csv::Error },

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized command type '{command}'")]
    UnrecognizedType { line: usize, command: String },

    #[error("line {line}: {command} missing {field}")]
    MissingField {
        line: usize,
        command: String,
        field: &'static str,
    },

    #[error("line {line}: invalid capacities '{value}', expected CATEGORY=N;CATEGORY=N")]
    InvalidCapacities { line: usize, value: String },

    #[error("failed to write report: {0}")]
    Write(#[from] csv::Error),

    #[error("failed to flush report: {0}")]
    Flush(#[from] io::Error),
}

#[derive(Debug, Deserialize)]
struct InputRow {
    r#type: String,
    owner: OwnerId,
    panel: Option<PanelId>,
    client: Option<ClientId>,
    category: Option<String>,
    name: Option<String>,
    capacities: Option<String>,
    login: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Serialize)]
struct OutputRow<'a> {
    owner: OwnerId,
    panel: PanelId,
    name: &'a str,
    category: &'a str,
    capacity: u32,
    filled: u32,
    available: i64,
    full: bool,
    login: &'a str,
}

/// Read allocator commands from a csv file
pub fn read_commands(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<Command, CsvError>>, CsvError> {
    let path = path.as_ref();
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| CsvError::Open {
            path: path.display().to_string(),
            source,
        })?;

    Ok(reader
        .into_deserialize::<InputRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            parse_row(line, row)
        }))
}

fn parse_row(line: usize, row: InputRow) -> Result<Command, CsvError> {
    let owner = row.owner;
    let command = row.r#type.as_str();
    let missing = |field: &'static str| CsvError::MissingField {
        line,
        command: command.to_string(),
        field,
    };

    match command {
        "create_panel" => Ok(Command::CreatePanel {
            owner,
            panel: row.panel.ok_or_else(|| missing("panel"))?,
            // an empty name is passed through, the allocator rejects it
            name: row.name.unwrap_or_default(),
            capacities: parse_capacities(line, row.capacities.as_deref())?,
        }),
        "update_capacities" => Ok(Command::UpdateCapacities {
            owner,
            panel: row.panel.ok_or_else(|| missing("panel"))?,
            capacities: parse_capacities(line, row.capacities.as_deref())?,
        }),
        "rename_panel" => Ok(Command::RenamePanel {
            owner,
            panel: row.panel.ok_or_else(|| missing("panel"))?,
            name: row.name.unwrap_or_default(),
        }),
        "delete_panel" => Ok(Command::DeletePanel {
            owner,
            panel: row.panel.ok_or_else(|| missing("panel"))?,
        }),
        "add_client" => Ok(Command::AddClient {
            owner,
            client: row.client.ok_or_else(|| missing("client"))?,
            credential: Credential::new(
                row.login.unwrap_or_default(),
                row.password.unwrap_or_default(),
            ),
        }),
        "remove_client" => Ok(Command::RemoveClient {
            owner,
            client: row.client.ok_or_else(|| missing("client"))?,
        }),
        "link" => Ok(Command::Link {
            owner,
            panel: row.panel.ok_or_else(|| missing("panel"))?,
            client: row.client.ok_or_else(|| missing("client"))?,
            category: row
                .category
                .map(SlotCategory::new)
                .ok_or_else(|| missing("category"))?,
        }),
        "unlink" => Ok(Command::Unlink {
            owner,
            client: row.client.ok_or_else(|| missing("client"))?,
        }),
        other => Err(CsvError::UnrecognizedType {
            line,
            command: other.to_string(),
        }),
    }
}

/// Parse `P2P=1;IPTV=2`. Negative values are kept for the allocator to reject.
fn parse_capacities(
    line: usize,
    value: Option<&str>,
) -> Result<Vec<(SlotCategory, i64)>, CsvError> {
    let value = value.unwrap_or_default();
    let invalid = || CsvError::InvalidCapacities {
        line,
        value: value.to_string(),
    };

    value
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (category, capacity) = entry.split_once('=').ok_or_else(invalid)?;
            let category = category.trim();
            if category.is_empty() {
                return Err(invalid());
            }
            let capacity = capacity.trim().parse::<i64>().map_err(|_| invalid())?;
            Ok((SlotCategory::new(category), capacity))
        })
        .collect()
}

/// Write panel occupancy in csv format, one row per panel and category
pub fn write_occupancy(
    writer: impl io::Write,
    panels: &[PanelOccupancy],
) -> Result<(), CsvError> {
    let mut writer = csv::Writer::from_writer(writer);

    for panel in panels {
        let login = panel.shared.as_ref().map_or("", |c| c.login.as_str());
        let full = panel.is_full();
        for category in &panel.categories {
            writer.serialize(OutputRow {
                owner: panel.owner,
                panel: panel.panel,
                name: &panel.name,
                category: category.category.as_str(),
                capacity: category.capacity,
                filled: category.filled,
                available: category.available,
                full,
                login,
            })?;
        }
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Allocator;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "type,owner,panel,client,category,name,capacities,login,password\n";

    fn write_csv(rows: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(HEADER.as_bytes()).unwrap();
        file.write_all(rows.as_bytes()).unwrap();
        file
    }

    fn read(rows: &str) -> Vec<Result<Command, CsvError>> {
        let file = write_csv(rows);
        read_commands(file.path()).unwrap().collect()
    }

    #[test]
    fn read_create_panel() {
        let results = read("create_panel,1,10,,,main,P2P=1;IPTV=2,,\n");
        assert_eq!(results.len(), 1);

        match results.into_iter().next().unwrap().unwrap() {
            Command::CreatePanel {
                owner,
                panel,
                name,
                capacities,
            } => {
                assert_eq!(owner, 1);
                assert_eq!(panel, 10);
                assert_eq!(name, "main");
                assert_eq!(
                    capacities,
                    [(SlotCategory::P2P, 1), (SlotCategory::IPTV, 2)]
                );
            }
            _ => panic!("expected create_panel"),
        }
    }

    #[test]
    fn read_add_client_with_empty_credential() {
        let results = read("add_client,1,,5,,,,,\n");
        match results.into_iter().next().unwrap().unwrap() {
            Command::AddClient { client, credential, .. } => {
                assert_eq!(client, 5);
                assert_eq!(credential, Credential::default());
            }
            _ => panic!("expected add_client"),
        }
    }

    #[test]
    fn read_link() {
        let results = read("link,1,10,5,IPTV,,,,\n");
        match results.into_iter().next().unwrap().unwrap() {
            Command::Link {
                panel,
                client,
                category,
                ..
            } => {
                assert_eq!(panel, 10);
                assert_eq!(client, 5);
                assert_eq!(category, SlotCategory::IPTV);
            }
            _ => panic!("expected link"),
        }
    }

    #[test]
    fn read_with_whitespace() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "type, owner, panel, client, category, name, capacities, login, password\n\
             unlink, 1, , 5, , , , , \n",
        )
        .unwrap();
        let results: Vec<_> = read_commands(file.path()).unwrap().collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Ok(Command::Unlink {
                owner: 1,
                client: 5
            })
        ));
    }

    #[test]
    fn read_keeps_negative_capacity() {
        let results = read("update_capacities,1,10,,,,P2P=-1,,\n");
        match results.into_iter().next().unwrap().unwrap() {
            Command::UpdateCapacities { capacities, .. } => {
                assert_eq!(capacities, [(SlotCategory::P2P, -1)]);
            }
            _ => panic!("expected update_capacities"),
        }
    }

    #[test]
    fn read_returns_error_for_unknown_type() {
        let results = read("evict,1,10,,,,,,\n");
        let err = results[0].as_ref().unwrap_err();
        assert!(matches!(err, CsvError::UnrecognizedType { line: 2, .. }));
    }

    #[test]
    fn read_returns_error_for_missing_field() {
        let results = read("create_panel,1,10,,,main,P2P=1,,\nlink,1,10,5,,,,,\n");
        assert!(results[0].is_ok());
        let err = results[1].as_ref().unwrap_err();
        assert!(matches!(
            err,
            CsvError::MissingField {
                line: 3,
                field: "category",
                ..
            }
        ));
    }

    #[test]
    fn read_returns_error_for_bad_capacities() {
        let results = read("create_panel,1,10,,,main,P2P:1,,\n");
        let err = results[0].as_ref().unwrap_err();
        assert!(matches!(err, CsvError::InvalidCapacities { line: 2, .. }));
    }

    #[test]
    fn read_missing_file_fails() {
        assert!(matches!(
            read_commands("/nonexistent/commands.csv"),
            Err(CsvError::Open { .. })
        ));
    }

    #[test]
    fn write_one_row_per_category() {
        let mut alloc = Allocator::new();
        alloc
            .create_panel(1, 10, "main", [(SlotCategory::P2P, 1), (SlotCategory::IPTV, 2)])
            .unwrap();
        alloc.add_client(1, 5, Credential::new("u1", "secret")).unwrap();
        alloc.link_client(1, 10, 5, SlotCategory::IPTV).unwrap();

        let mut out = Vec::new();
        write_occupancy(&mut out, &alloc.list_all_panels().unwrap()).unwrap();
        let out = String::from_utf8(out).unwrap();

        let lines: Vec<_> = out.lines().collect();
        assert_eq!(
            lines,
            [
                "owner,panel,name,category,capacity,filled,available,full,login",
                "1,10,main,IPTV,2,1,1,false,u1",
                "1,10,main,P2P,1,0,1,false,u1",
            ]
        );
        assert!(!out.contains("secret"));
    }
}
