use anyhow::{Context, Result};
use tombola_db::rusqlite::Connection;
use std::path::Path;

use tombola_db::db::replace_participants;
use tombola_db::models::{Participant, validate_participant};

fn parse_record(record: &csv::StringRecord) -> Result<Participant> {
    let get = |idx: usize| -> Result<String> {
        record
            .get(idx)
            .map(|s| s.trim().to_string())
            .with_context(|| format!("Champ manquant à l'index {}", idx))
    };

    let participant = Participant::new(&get(0)?, &get(1)?, &get(2)?);
    validate_participant(&participant)?;
    Ok(participant)
}

pub struct ImportResult {
    pub total_records: u32,
    pub imported: u32,
    pub errors: u32,
}

/// Lit un CSV `nom;niveau;salle` (avec ligne d'en-tête) et remplace toute la
/// liste des participants. Les lignes incomplètes sont ignorées.
pub fn import_csv(conn: &Connection, path: &Path, delimiter: u8) -> Result<ImportResult> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Impossible d'ouvrir {:?}", path))?;

    let mut result = ImportResult {
        total_records: 0,
        imported: 0,
        errors: 0,
    };
    let mut participants = Vec::new();

    for record_result in reader.records() {
        result.total_records += 1;
        match record_result {
            Ok(record) => match parse_record(&record) {
                Ok(participant) => participants.push(participant),
                Err(e) => {
                    log::warn!("Ligne {} ignorée : {}", result.total_records, e);
                    result.errors += 1;
                }
            },
            Err(e) => {
                log::warn!("Erreur lecture ligne {} : {}", result.total_records, e);
                result.errors += 1;
            }
        }
    }

    result.imported = replace_participants(conn, &participants)? as u32;
    log::info!(
        "Import de {:?} : {} participants, {} erreurs",
        path,
        result.imported,
        result.errors
    );
    Ok(result)
}
