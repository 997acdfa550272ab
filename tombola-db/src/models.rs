use anyhow::{bail, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: i64,
    pub name: String,
    /// Niveau (ex: "6e").
    pub group: String,
    /// Salle, n'a de sens qu'à l'intérieur de `group`.
    pub subgroup: String,
    pub selected: bool,
    pub selected_at: Option<String>,
}

impl Participant {
    /// Participant pas encore enregistré (id attribué par la base).
    pub fn new(name: &str, group: &str, subgroup: &str) -> Self {
        Self {
            id: 0,
            name: name.trim().to_string(),
            group: group.trim().to_string(),
            subgroup: subgroup.trim().to_string(),
            selected: false,
            selected_at: None,
        }
    }

    pub fn is_well_formed(&self) -> bool {
        !self.group.trim().is_empty() && !self.subgroup.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    pub group: String,
    pub total: u32,
    pub won: u32,
    pub subgroups: u32,
}

impl GroupSummary {
    pub fn remaining(&self) -> u32 {
        self.total.saturating_sub(self.won)
    }
}

pub fn validate_participant(participant: &Participant) -> Result<()> {
    if participant.name.trim().is_empty() {
        bail!("Nom manquant");
    }
    if participant.group.trim().is_empty() {
        bail!("Niveau manquant pour {}", participant.name);
    }
    if participant.subgroup.trim().is_empty() {
        bail!("Salle manquante pour {}", participant.name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_fields() {
        let p = Participant::new("  Alice ", " 6e", "B12  ");
        assert_eq!(p.name, "Alice");
        assert_eq!(p.group, "6e");
        assert_eq!(p.subgroup, "B12");
        assert!(!p.selected);
        assert!(p.selected_at.is_none());
    }

    #[test]
    fn test_well_formed() {
        assert!(Participant::new("Alice", "6e", "B12").is_well_formed());
        assert!(!Participant::new("Alice", "", "B12").is_well_formed());
        assert!(!Participant::new("Alice", "6e", "   ").is_well_formed());
    }

    #[test]
    fn test_validate_participant() {
        assert!(validate_participant(&Participant::new("Alice", "6e", "B12")).is_ok());
        assert!(validate_participant(&Participant::new("", "6e", "B12")).is_err());
        assert!(validate_participant(&Participant::new("Alice", "", "B12")).is_err());
        assert!(validate_participant(&Participant::new("Alice", "6e", "")).is_err());
    }

    #[test]
    fn test_group_summary_remaining() {
        let summary = GroupSummary {
            group: "5e".to_string(),
            total: 10,
            won: 3,
            subgroups: 2,
        };
        assert_eq!(summary.remaining(), 7);
    }
}
