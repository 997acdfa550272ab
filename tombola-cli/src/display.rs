use comfy_table::{Table, ContentArrangement, presets::UTF8_FULL, Cell, Color};

use crate::draw::session::DrawSession;
use crate::import::ImportResult;
use tombola_db::models::{GroupSummary, Participant};

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn display_participants(participants: &[Participant]) {
    if participants.is_empty() {
        println!("Aucun participant à afficher.");
        return;
    }

    let mut table = new_table(vec!["#", "Nom", "Niveau", "Salle", "Statut"]);
    for p in participants {
        let status = if p.selected {
            Cell::new("gagnant").fg(Color::Green)
        } else {
            Cell::new("—")
        };
        table.add_row(vec![
            Cell::new(p.id),
            Cell::new(&p.name),
            Cell::new(&p.group),
            Cell::new(&p.subgroup),
            status,
        ]);
    }
    println!("{table}");
}

pub fn display_order(order: &[Participant], highlight: usize) {
    if order.is_empty() {
        println!("Aucun participant en lice.");
        return;
    }

    println!("\n🎲 Ordre de tirage ({} participants)\n", order.len());
    let mut table = new_table(vec!["Rang", "Nom", "Niveau", "Salle"]);
    for (i, p) in order.iter().enumerate() {
        let rank = Cell::new(i + 1);
        let rank = if i < highlight { rank.fg(Color::Green) } else { rank };
        table.add_row(vec![rank, Cell::new(&p.name), Cell::new(&p.group), Cell::new(&p.subgroup)]);
    }
    println!("{table}");
}

pub fn display_candidate(candidate: &Participant, rank: usize) {
    println!(
        "\n🎁 Lot n°{} → {} ({} / salle {})",
        rank, candidate.name, candidate.group, candidate.subgroup
    );
}

pub fn display_winners(winners: &[Participant]) {
    if winners.is_empty() {
        println!("Aucun gagnant pour le moment.");
        return;
    }

    let mut table = new_table(vec!["Lot", "Nom", "Niveau", "Salle", "Confirmé le"]);
    for (i, w) in winners.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&w.name),
            Cell::new(&w.group),
            Cell::new(&w.subgroup),
            Cell::new(w.selected_at.as_deref().unwrap_or("—")),
        ]);
    }
    println!("{table}");
}

pub fn display_session_summary(session: &DrawSession) {
    println!("\nSession terminée :");
    println!("  Gagnants confirmés : {}", session.winners().len());
    println!("  Candidats passés   : {}", session.skipped().len());
    println!("  Encore dans l'ordre: {}", session.remaining());
}

pub fn display_import_summary(result: &ImportResult) {
    println!("Import terminé :");
    println!("  Total lignes lues : {}", result.total_records);
    println!("  Importés          : {}", result.imported);
    if result.errors > 0 {
        println!("  Lignes ignorées   : {}", result.errors);
    }
}

pub fn display_stats(summaries: &[GroupSummary], total: u32, winners: u32) {
    println!("\n📊 {} participants, {} gagnants\n", total, winners);

    let mut table = new_table(vec!["Niveau", "Salles", "Inscrits", "Gagnants", "En lice"]);
    for s in summaries {
        table.add_row(vec![
            &s.group,
            &s.subgroups.to_string(),
            &s.total.to_string(),
            &s.won.to_string(),
            &s.remaining().to_string(),
        ]);
    }
    println!("{table}");
}
