use anyhow::Result;
use tombola_db::db::mark_won;
use tombola_db::models::Participant;
use tombola_db::rusqlite::Connection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Confirm,
    Skip,
    Stop,
}

pub fn parse_decision(input: &str) -> Option<Decision> {
    match input.trim().to_lowercase().as_str() {
        "" | "o" | "oui" | "y" | "yes" => Some(Decision::Confirm),
        "p" | "passer" | "s" | "skip" => Some(Decision::Skip),
        "q" | "quitter" | "quit" | "stop" => Some(Decision::Stop),
        _ => None,
    }
}

/// Consomme un ordre de tirage, une entrée à la fois, jusqu'à `target`
/// gagnants confirmés ou épuisement de l'ordre.
pub struct DrawSession {
    order: Vec<Participant>,
    cursor: usize,
    target: usize,
    winners: Vec<Participant>,
    skipped: Vec<Participant>,
}

impl DrawSession {
    pub fn new(order: Vec<Participant>, target: usize) -> Self {
        Self {
            order,
            cursor: 0,
            target,
            winners: Vec::with_capacity(target),
            skipped: Vec::new(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.winners.len() >= self.target || self.cursor >= self.order.len()
    }

    pub fn current(&self) -> Option<&Participant> {
        if self.is_finished() {
            return None;
        }
        self.order.get(self.cursor)
    }

    /// Marque le candidat courant comme gagnant. Retourne `false` si la base
    /// le connaissait déjà comme gagnant ; il est alors compté comme passé.
    pub fn confirm(&mut self, conn: &Connection) -> Result<bool> {
        let Some(candidate) = self.current().cloned() else {
            return Ok(false);
        };
        self.cursor += 1;

        if mark_won(conn, candidate.id)? {
            log::info!(
                "Gagnant n°{} : {} ({} / {})",
                self.winners.len() + 1,
                candidate.name,
                candidate.group,
                candidate.subgroup
            );
            self.winners.push(candidate);
            Ok(true)
        } else {
            log::warn!("{} (id {}) était déjà marqué gagnant", candidate.name, candidate.id);
            self.skipped.push(candidate);
            Ok(false)
        }
    }

    pub fn skip(&mut self) {
        if let Some(candidate) = self.current().cloned() {
            log::debug!("Candidat passé : {}", candidate.name);
            self.cursor += 1;
            self.skipped.push(candidate);
        }
    }

    pub fn winners(&self) -> &[Participant] {
        &self.winners
    }

    pub fn skipped(&self) -> &[Participant] {
        &self.skipped
    }

    pub fn remaining(&self) -> usize {
        self.order.len() - self.cursor
    }
}

/// Déroule la session ; `decide` reçoit le candidat courant et le rang
/// du prochain gagnant.
pub fn run_session<F>(conn: &Connection, session: &mut DrawSession, mut decide: F) -> Result<()>
where
    F: FnMut(&Participant, usize) -> Result<Decision>,
{
    while let Some(candidate) = session.current() {
        let rank = session.winners().len() + 1;
        match decide(candidate, rank)? {
            Decision::Confirm => {
                session.confirm(conn)?;
            }
            Decision::Skip => session.skip(),
            Decision::Stop => break,
        }
    }
    Ok(())
}
