use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use tombola_cli::config::{DrawConfig, load_config};
use tombola_cli::display::{
    display_candidate, display_import_summary, display_order, display_participants,
    display_session_summary, display_stats, display_winners,
};
use tombola_cli::draw::fair::FairSelector;
use tombola_cli::draw::session::{Decision, DrawSession, parse_decision, run_session};
use tombola_cli::draw::{draw_order, draw_rng};
use tombola_cli::import::import_csv;
use tombola_db::db::{
    count_participants, count_winners, db_path, fetch_participants, fetch_pool, fetch_winners,
    group_summaries, insert_participant, migrate, open_db, reset_winners,
};
use tombola_db::models::{Participant, validate_participant};
use tombola_db::rusqlite::Connection;

#[derive(Parser)]
#[command(name = "tombola", about = "Tirage au sort équitable par niveau et par salle")]
struct Cli {
    /// Base de données (défaut: data/tombola.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Configuration JSON du tirage
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Importer les participants depuis un fichier CSV (remplace la liste)
    Import {
        /// Chemin vers le fichier CSV (nom, niveau, salle)
        #[arg(short, long, default_value = "assets/participants.csv")]
        file: PathBuf,

        /// Séparateur (défaut: celui de la configuration)
        #[arg(short, long)]
        delimiter: Option<char>,
    },

    /// Afficher le chemin de la base de données
    DbPath,

    /// Lister les participants encore en lice
    List {
        /// Limiter à un niveau
        #[arg(short, long)]
        group: Option<String>,

        /// Inclure les gagnants
        #[arg(short, long)]
        all: bool,
    },

    /// Ajouter un participant manuellement
    Add,

    /// Afficher les effectifs par niveau
    Stats,

    /// Afficher l'ordre de tirage sans rien enregistrer
    Preview {
        #[arg(short, long)]
        group: Option<String>,

        /// Seed pour la reproductibilité
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Lancer une session de tirage
    Draw {
        /// Nombre de gagnants (défaut: celui de la configuration)
        #[arg(short = 'n', long)]
        count: Option<usize>,

        #[arg(short, long)]
        group: Option<String>,

        #[arg(long)]
        seed: Option<u64>,

        /// Confirmer chaque candidat sans demander
        #[arg(short, long)]
        yes: bool,
    },

    /// Lister les gagnants dans l'ordre du tirage
    Winners,

    /// Remettre tous les participants en lice
    Reset {
        #[arg(short, long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let path = cli.db.unwrap_or_else(db_path);
    let conn = open_db(&path)?;
    migrate(&conn)?;

    match cli.command {
        Command::Import { file, delimiter } => cmd_import(&conn, &config, &file, delimiter),
        Command::DbPath => {
            println!("{}", path.display());
            Ok(())
        }
        Command::List { group, all } => cmd_list(&conn, group.as_deref(), all),
        Command::Add => cmd_add(&conn),
        Command::Stats => cmd_stats(&conn),
        Command::Preview { group, seed } => cmd_preview(&conn, &config, group.as_deref(), seed),
        Command::Draw { count, group, seed, yes } => {
            cmd_draw(&conn, &config, count, group.as_deref(), seed, yes)
        }
        Command::Winners => cmd_winners(&conn),
        Command::Reset { yes } => cmd_reset(&conn, yes),
    }
}

fn ensure_not_empty(conn: &Connection) -> Result<bool> {
    if count_participants(conn)? == 0 {
        println!("Base vide. Lancez d'abord : tombola import");
        return Ok(false);
    }
    Ok(true)
}

fn cmd_import(conn: &Connection, config: &DrawConfig, file: &Path, delimiter: Option<char>) -> Result<()> {
    let config = DrawConfig {
        delimiter: delimiter.unwrap_or(config.delimiter),
        ..config.clone()
    };
    let result = import_csv(conn, file, config.delimiter_byte()?)?;
    display_import_summary(&result);
    Ok(())
}

fn cmd_list(conn: &Connection, group: Option<&str>, all: bool) -> Result<()> {
    if !ensure_not_empty(conn)? {
        return Ok(());
    }
    let participants = if all {
        fetch_participants(conn)?
            .into_iter()
            .filter(|p| group.is_none_or(|g| p.group == g))
            .collect()
    } else {
        fetch_pool(conn, group)?
    };
    display_participants(&participants);
    Ok(())
}

fn cmd_stats(conn: &Connection) -> Result<()> {
    if !ensure_not_empty(conn)? {
        return Ok(());
    }
    let summaries = group_summaries(conn)?;
    display_stats(&summaries, count_participants(conn)?, count_winners(conn)?);
    Ok(())
}

fn cmd_preview(conn: &Connection, config: &DrawConfig, group: Option<&str>, seed: Option<u64>) -> Result<()> {
    if !ensure_not_empty(conn)? {
        return Ok(());
    }
    let selector = FairSelector::with_group_cooldown(config.group_cooldown);
    let mut rng = draw_rng(seed);
    let order = draw_order(conn, group, &selector, &mut rng)?;
    display_order(&order, config.session_size);
    Ok(())
}

fn cmd_draw(
    conn: &Connection,
    config: &DrawConfig,
    count: Option<usize>,
    group: Option<&str>,
    seed: Option<u64>,
    yes: bool,
) -> Result<()> {
    if !ensure_not_empty(conn)? {
        return Ok(());
    }
    let selector = FairSelector::with_group_cooldown(config.group_cooldown);
    let mut rng = draw_rng(seed);
    let order = draw_order(conn, group, &selector, &mut rng)?;
    if order.is_empty() {
        println!("Plus personne en lice. Lancez : tombola reset");
        return Ok(());
    }

    let target = count.unwrap_or(config.session_size);
    println!("Tirage de {} lots parmi {} participants", target, order.len());

    let mut session = DrawSession::new(order, target);
    run_session(conn, &mut session, |candidate, rank| {
        display_candidate(candidate, rank);
        if yes {
            return Ok(Decision::Confirm);
        }
        prompt_decision()
    })?;

    display_session_summary(&session);
    display_winners(session.winners());
    Ok(())
}

fn cmd_winners(conn: &Connection) -> Result<()> {
    let winners = fetch_winners(conn)?;
    display_winners(&winners);
    Ok(())
}

fn cmd_reset(conn: &Connection, yes: bool) -> Result<()> {
    if !yes {
        let confirm = prompt("Remettre tous les gagnants en lice ? (o/n) : ")?;
        if confirm.trim().to_lowercase() != "o" {
            println!("Remise à zéro annulée.");
            return Ok(());
        }
    }
    let n = reset_winners(conn)?;
    println!("{} participants remis en lice.", n);
    Ok(())
}

fn cmd_add(conn: &Connection) -> Result<()> {
    println!("Ajout d'un participant manuellement\n");

    let name = prompt("Nom : ")?;
    let group = prompt("Niveau (ex: 6e) : ")?;
    let subgroup = prompt("Salle (ex: B12) : ")?;

    let participant = Participant::new(&name, &group, &subgroup);
    validate_participant(&participant)?;

    println!("\nParticipant à insérer :");
    display_participants(std::slice::from_ref(&participant));

    let confirm = prompt("\nConfirmer l'insertion ? (o/n) : ")?;
    if confirm.trim().to_lowercase() == "o" {
        let id = insert_participant(conn, &participant)?;
        println!("Participant inséré (id {}).", id);
    } else {
        println!("Insertion annulée.");
    }

    Ok(())
}

fn prompt_decision() -> Result<Decision> {
    loop {
        let input = prompt("Confirmer [o], passer [p] ou arrêter [q] ? ")?;
        match parse_decision(&input) {
            Some(decision) => return Ok(decision),
            None => println!("Réponse non reconnue. Réessayez."),
        }
    }
}

fn prompt(msg: &str) -> Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Erreur de lecture")?;
    Ok(input.trim().to_string())
}
