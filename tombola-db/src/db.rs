use anyhow::{Context, Result};
use chrono::SecondsFormat;
use rusqlite::{Connection, Row};
use std::path::Path;

use crate::models::{GroupSummary, Participant};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS participants (
    id        INTEGER PRIMARY KEY,
    name      TEXT NOT NULL,
    level     TEXT NOT NULL,
    room      TEXT NOT NULL,
    won       INTEGER NOT NULL DEFAULT 0,
    won_at    TEXT,
    won_rank  INTEGER
);
CREATE INDEX IF NOT EXISTS idx_participants_level ON participants (level, won);
";

const COLUMNS: &str = "id, name, level, room, won, won_at";

pub fn db_path() -> std::path::PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("tombola.db");
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Impossible de créer le répertoire {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Impossible d'ouvrir la base {:?}", path))?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Échec de la migration")?;
    Ok(())
}

fn participant_from_row(row: &Row<'_>) -> rusqlite::Result<Participant> {
    Ok(Participant {
        id: row.get(0)?,
        name: row.get(1)?,
        group: row.get(2)?,
        subgroup: row.get(3)?,
        selected: row.get::<_, i64>(4)? != 0,
        selected_at: row.get(5)?,
    })
}

pub fn insert_participant(conn: &Connection, participant: &Participant) -> Result<i64> {
    conn.execute(
        "INSERT INTO participants (name, level, room) VALUES (?1, ?2, ?3)",
        rusqlite::params![participant.name, participant.group, participant.subgroup],
    ).context("Échec de l'insertion")?;
    Ok(conn.last_insert_rowid())
}

/// Remplace toute la liste des participants (les gagnants sont perdus).
pub fn replace_participants(conn: &Connection, participants: &[Participant]) -> Result<usize> {
    let tx = conn.unchecked_transaction()
        .context("Impossible de démarrer la transaction")?;

    tx.execute("DELETE FROM participants", [])
        .context("Échec de la suppression des participants")?;
    for participant in participants {
        insert_participant(&tx, participant)?;
    }

    tx.commit().context("Échec du commit")?;
    Ok(participants.len())
}

/// Participants encore en lice, éventuellement limités à un niveau.
pub fn fetch_pool(conn: &Connection, group: Option<&str>) -> Result<Vec<Participant>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM participants
         WHERE won = 0 AND (?1 IS NULL OR level = ?1)
         ORDER BY id"
    ))?;
    let pool = stmt
        .query_map([group], participant_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(pool)
}

pub fn fetch_participants(conn: &Connection) -> Result<Vec<Participant>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM participants ORDER BY level, room, name"
    ))?;
    let participants = stmt
        .query_map([], participant_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(participants)
}

/// Gagnants dans l'ordre de confirmation.
pub fn fetch_winners(conn: &Connection) -> Result<Vec<Participant>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM participants WHERE won = 1 ORDER BY won_rank, id"
    ))?;
    let winners = stmt
        .query_map([], participant_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(winners)
}

/// Marque un participant comme gagnant. Retourne `false` s'il l'était déjà
/// (ou s'il n'existe pas), ce qui rend l'appel idempotent.
pub fn mark_won(conn: &Connection, id: i64) -> Result<bool> {
    let now = chrono::Local::now().to_rfc3339_opts(SecondsFormat::Secs, false);
    let changed = conn.execute(
        "UPDATE participants
         SET won = 1,
             won_at = ?2,
             won_rank = (SELECT COALESCE(MAX(won_rank), 0) + 1 FROM participants)
         WHERE id = ?1 AND won = 0",
        rusqlite::params![id, now],
    ).with_context(|| format!("Impossible de marquer le participant {} comme gagnant", id))?;
    Ok(changed > 0)
}

pub fn reset_winners(conn: &Connection) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE participants SET won = 0, won_at = NULL, won_rank = NULL WHERE won = 1",
        [],
    ).context("Échec de la remise à zéro")?;
    Ok(changed)
}

pub fn count_participants(conn: &Connection) -> Result<u32> {
    let count: u32 = conn.query_row("SELECT COUNT(*) FROM participants", [], |row| row.get(0))?;
    Ok(count)
}

pub fn count_winners(conn: &Connection) -> Result<u32> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM participants WHERE won = 1",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn group_summaries(conn: &Connection) -> Result<Vec<GroupSummary>> {
    let mut stmt = conn.prepare(
        "SELECT level, COUNT(*), COALESCE(SUM(won), 0), COUNT(DISTINCT room)
         FROM participants GROUP BY level ORDER BY level"
    )?;
    let summaries = stmt.query_map([], |row| {
        Ok(GroupSummary {
            group: row.get(0)?,
            total: row.get(1)?,
            won: row.get(2)?,
            subgroups: row.get(3)?,
        })
    })?.collect::<Result<Vec<_>, _>>()?;
    Ok(summaries)
}
