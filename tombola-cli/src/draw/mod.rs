pub mod fair;
pub mod session;

use anyhow::Result;
use rand::SeedableRng;
use rand::rngs::StdRng;

use tombola_db::db::fetch_pool;
use tombola_db::models::Participant;
use tombola_db::rusqlite::Connection;

use crate::draw::fair::FairSelector;

pub fn draw_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_rng(&mut rand::rng()),
    }
}

/// Écarte les participants sans niveau ou sans salle.
pub fn well_formed(pool: Vec<Participant>) -> Vec<Participant> {
    pool.into_iter()
        .filter(|p| {
            if !p.is_well_formed() {
                log::warn!("Participant {} (id {}) ignoré : niveau ou salle manquant", p.name, p.id);
                return false;
            }
            true
        })
        .collect()
}

/// Charge les participants encore en lice et retourne leur ordre de tirage.
pub fn draw_order(
    conn: &Connection,
    group: Option<&str>,
    selector: &FairSelector,
    rng: &mut StdRng,
) -> Result<Vec<Participant>> {
    let pool = well_formed(fetch_pool(conn, group)?);
    log::info!(
        "Ordre de tirage sur {} participants (cooldown niveau = {})",
        pool.len(),
        selector.group_cooldown()
    );
    Ok(selector.order(pool, rng))
}
