//! Ordre de tirage « équitable » : mélange pondéré par des temps de recharge
//! (cooldowns) par niveau et par salle, pour éviter qu'un même niveau ou une
//! même salle sorte plusieurs fois de suite devant le public.

use std::collections::HashMap;

use rand::prelude::*;
use rand::{Rng, RngExt};

use tombola_db::models::Participant;

/// Nombre de tirages pendant lesquels un niveau tiré reste inéligible.
pub const GROUP_COOLDOWN_WINDOW: usize = 5;

/// Une entrée rangée dans un niveau (`group`) puis une salle (`subgroup`).
pub trait Categorized {
    fn group(&self) -> &str;
    fn subgroup(&self) -> &str;
}

impl Categorized for Participant {
    fn group(&self) -> &str {
        &self.group
    }

    fn subgroup(&self) -> &str {
        &self.subgroup
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FairSelector {
    group_cooldown: usize,
}

impl Default for FairSelector {
    fn default() -> Self {
        Self { group_cooldown: GROUP_COOLDOWN_WINDOW }
    }
}

impl FairSelector {
    pub fn with_group_cooldown(group_cooldown: usize) -> Self {
        Self { group_cooldown }
    }

    pub fn group_cooldown(&self) -> usize {
        self.group_cooldown
    }

    /// Retourne une permutation de `pool` dans l'ordre où les entrées doivent
    /// être tirées. En dessous de 3 entrées, l'ordre d'origine est conservé.
    pub fn order<T: Categorized>(&self, pool: Vec<T>, rng: &mut impl Rng) -> Vec<T> {
        if pool.len() <= 2 {
            return pool;
        }

        let mut state = DrawState::new(&pool, self.group_cooldown, rng);
        let mut picks = Vec::with_capacity(pool.len());
        while picks.len() < pool.len() {
            match state.pick(rng) {
                Some(idx) => picks.push(idx),
                None => {
                    log::warn!(
                        "Tirage interrompu après {} sélections sur {}",
                        picks.len(),
                        pool.len()
                    );
                    break;
                }
            }
        }

        let mut slots: Vec<Option<T>> = pool.into_iter().map(Some).collect();
        let mut ordered: Vec<T> = picks.into_iter().filter_map(|idx| slots[idx].take()).collect();
        // Ne jamais perdre d'entrée, même si la boucle s'est arrêtée trop tôt
        ordered.extend(slots.into_iter().flatten());
        ordered
    }
}

/// Ordre de tirage avec la fenêtre de recharge par défaut.
pub fn select<T: Categorized>(pool: Vec<T>, rng: &mut impl Rng) -> Vec<T> {
    FairSelector::default().order(pool, rng)
}

/// État d'un seul appel : niveaux et salles reçoivent des identifiants denses
/// et les cooldowns vivent dans des tables indexées par ces identifiants.
struct DrawState {
    /// Index (dans le pool d'origine) des entrées restantes, par niveau.
    buckets: Vec<Vec<usize>>,
    /// Identifiant de salle de chaque entrée du pool.
    entry_subgroup: Vec<usize>,
    /// Fenêtre de recharge des salles, par niveau.
    subgroup_window: Vec<usize>,
    group_cooldown: Vec<usize>,
    subgroup_cooldown: Vec<usize>,
    group_window: usize,
}

impl DrawState {
    fn new<T: Categorized>(pool: &[T], group_window: usize, rng: &mut impl Rng) -> Self {
        let mut group_ids: HashMap<&str, usize> = HashMap::new();
        let mut subgroup_ids: HashMap<(&str, &str), usize> = HashMap::new();
        let mut buckets: Vec<Vec<usize>> = Vec::new();
        let mut subgroup_counts: Vec<usize> = Vec::new();
        let mut entry_subgroup = Vec::with_capacity(pool.len());

        for (idx, entry) in pool.iter().enumerate() {
            let gid = match group_ids.get(entry.group()) {
                Some(&gid) => gid,
                None => {
                    let gid = buckets.len();
                    group_ids.insert(entry.group(), gid);
                    buckets.push(Vec::new());
                    subgroup_counts.push(0);
                    gid
                }
            };

            let next_sid = subgroup_ids.len();
            let sid = *subgroup_ids
                .entry((entry.group(), entry.subgroup()))
                .or_insert_with(|| {
                    subgroup_counts[gid] += 1;
                    next_sid
                });

            buckets[gid].push(idx);
            entry_subgroup.push(sid);
        }

        for bucket in &mut buckets {
            bucket.shuffle(rng);
        }

        let subgroup_window = subgroup_counts.iter().map(|&n| n.saturating_sub(1)).collect();

        Self {
            group_cooldown: vec![0; buckets.len()],
            subgroup_cooldown: vec![0; subgroup_ids.len()],
            buckets,
            entry_subgroup,
            subgroup_window,
            group_window,
        }
    }

    /// Choisit la prochaine entrée et retourne son index dans le pool.
    fn pick(&mut self, rng: &mut impl Rng) -> Option<usize> {
        let mut candidates: Vec<usize> = (0..self.buckets.len())
            .filter(|&gid| !self.buckets[gid].is_empty() && self.group_cooldown[gid] == 0)
            .collect();

        if candidates.is_empty() {
            // Tous les niveaux sont en recharge : celui qui sort le plus tôt
            let lowest = (0..self.buckets.len())
                .filter(|&gid| !self.buckets[gid].is_empty())
                .min_by_key(|&gid| self.group_cooldown[gid]);
            candidates.extend(lowest);
        }

        candidates.shuffle(rng);

        let mut chosen = None;
        for &gid in &candidates {
            if let Some(pos) = self.pick_in_group(gid, rng) {
                chosen = Some((gid, pos));
                break;
            }
        }

        let (gid, pos) = match chosen {
            Some(choice) => choice,
            None => {
                let gid = self.buckets.iter().position(|bucket| !bucket.is_empty())?;
                log::warn!("Aucun candidat valide, repli sur la première entrée disponible");
                (gid, 0)
            }
        };

        Some(self.commit(gid, pos))
    }

    /// Position, dans le bucket du niveau, d'une entrée dont la salle est
    /// éligible ; à défaut celle dont la salle sort de recharge le plus tôt.
    fn pick_in_group(&self, gid: usize, rng: &mut impl Rng) -> Option<usize> {
        let bucket = &self.buckets[gid];
        let cooldown_of = |pos: usize| self.subgroup_cooldown[self.entry_subgroup[bucket[pos]]];

        let eligible: Vec<usize> = (0..bucket.len()).filter(|&pos| cooldown_of(pos) == 0).collect();
        if eligible.is_empty() {
            return (0..bucket.len()).min_by_key(|&pos| cooldown_of(pos));
        }
        Some(eligible[rng.random_range(0..eligible.len())])
    }

    fn commit(&mut self, gid: usize, pos: usize) -> usize {
        let idx = self.buckets[gid].remove(pos);
        let sid = self.entry_subgroup[idx];

        let group_window = self.group_window;
        for (other, cooldown) in self.group_cooldown.iter_mut().enumerate() {
            *cooldown = if other == gid { group_window } else { cooldown.saturating_sub(1) };
        }

        let subgroup_window = self.subgroup_window[gid];
        for (other, cooldown) in self.subgroup_cooldown.iter_mut().enumerate() {
            *cooldown = if other == sid { subgroup_window } else { cooldown.saturating_sub(1) };
        }

        log::debug!(
            "Tirage : entrée {} (niveau #{}, salle #{}), {} restantes dans le niveau",
            idx,
            gid,
            sid,
            self.buckets[gid].len()
        );
        idx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[derive(Debug, Clone, PartialEq)]
    struct Ticket {
        id: usize,
        group: &'static str,
        subgroup: &'static str,
    }

    impl Categorized for Ticket {
        fn group(&self) -> &str {
            self.group
        }

        fn subgroup(&self) -> &str {
            self.subgroup
        }
    }

    /// (niveau, salle, nombre d'entrées)
    fn make_pool(layout: &[(&'static str, &'static str, usize)]) -> Vec<Ticket> {
        let mut pool = Vec::new();
        for &(group, subgroup, count) in layout {
            for _ in 0..count {
                pool.push(Ticket { id: pool.len(), group, subgroup });
            }
        }
        pool
    }

    fn ids(tickets: &[Ticket]) -> Vec<usize> {
        tickets.iter().map(|t| t.id).collect()
    }

    fn assert_permutation(pool: &[Ticket], order: &[Ticket]) {
        assert_eq!(pool.len(), order.len());
        let mut a = ids(pool);
        let mut b = ids(order);
        a.sort();
        b.sort();
        assert_eq!(a, b, "l'ordre doit être une permutation du pool");
    }

    /// Rejoue l'ordre produit et vérifie qu'à chaque tirage, le niveau et la
    /// salle retenus étaient éligibles, ou qu'aucune alternative éligible
    /// n'existait (auquel cas le cooldown retenu doit être minimal).
    fn assert_cooldowns_honored(order: &[Ticket], group_window: usize) {
        let mut remaining: HashMap<(&str, &str), usize> = HashMap::new();
        for t in order {
            *remaining.entry((t.group, t.subgroup)).or_insert(0) += 1;
        }
        let mut subgroup_count: HashMap<&str, usize> = HashMap::new();
        for &(group, _) in remaining.keys() {
            *subgroup_count.entry(group).or_insert(0) += 1;
        }
        let mut group_cd: HashMap<&str, usize> = subgroup_count.keys().map(|&g| (g, 0)).collect();
        let mut subgroup_cd: HashMap<(&str, &str), usize> = remaining.keys().map(|&k| (k, 0)).collect();

        for (step, t) in order.iter().enumerate() {
            let live_groups: Vec<&str> = group_cd
                .keys()
                .copied()
                .filter(|g| remaining.iter().any(|(&(rg, _), &n)| rg == *g && n > 0))
                .collect();
            let min_group_cd = live_groups.iter().map(|g| group_cd[g]).min().unwrap();
            assert_eq!(
                group_cd[t.group], min_group_cd,
                "tirage {step}: niveau {} choisi alors qu'un niveau plus éligible existait",
                t.group
            );

            let live_subgroups: Vec<(&str, &str)> = remaining
                .iter()
                .filter(|&(&(g, _), &n)| g == t.group && n > 0)
                .map(|(&k, _)| k)
                .collect();
            let min_subgroup_cd = live_subgroups.iter().map(|k| subgroup_cd[k]).min().unwrap();
            assert_eq!(
                subgroup_cd[&(t.group, t.subgroup)], min_subgroup_cd,
                "tirage {step}: salle {}/{} choisie alors qu'une salle plus éligible existait",
                t.group, t.subgroup
            );

            *remaining.get_mut(&(t.group, t.subgroup)).unwrap() -= 1;
            for (g, cd) in group_cd.iter_mut() {
                *cd = if *g == t.group { group_window } else { cd.saturating_sub(1) };
            }
            let window = subgroup_count[t.group].saturating_sub(1);
            for (k, cd) in subgroup_cd.iter_mut() {
                *cd = if *k == (t.group, t.subgroup) { window } else { cd.saturating_sub(1) };
            }
        }
    }

    #[test]
    fn test_empty_pool() {
        let mut rng = StdRng::seed_from_u64(1);
        let order = select(Vec::<Ticket>::new(), &mut rng);
        assert!(order.is_empty());
    }

    #[test]
    fn test_single_entry_unchanged() {
        let mut rng = StdRng::seed_from_u64(1);
        let pool = make_pool(&[("6e", "A", 1)]);
        assert_eq!(select(pool.clone(), &mut rng), pool);
    }

    #[test]
    fn test_two_entries_keep_input_order() {
        let pool = make_pool(&[("6e", "A", 1), ("6e", "A", 1)]);
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            assert_eq!(select(pool.clone(), &mut rng), pool);
        }
    }

    #[test]
    fn test_bijection() {
        let pool = make_pool(&[
            ("6e", "A", 4),
            ("6e", "B", 1),
            ("5e", "A", 3),
            ("4e", "C", 7),
            ("3e", "D", 2),
            ("3e", "E", 2),
        ]);
        for seed in 0..30 {
            let mut rng = StdRng::seed_from_u64(seed);
            let order = select(pool.clone(), &mut rng);
            assert_permutation(&pool, &order);
        }
    }

    #[test]
    fn test_cooldowns_honored_on_uneven_pools() {
        let pool = make_pool(&[
            ("6e", "A", 5),
            ("6e", "B", 2),
            ("6e", "C", 1),
            ("5e", "A", 6),
            ("4e", "A", 2),
            ("4e", "B", 2),
            ("3e", "A", 1),
            ("2nde", "A", 3),
            ("2nde", "B", 3),
            ("1re", "A", 4),
        ]);
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let order = select(pool.clone(), &mut rng);
            assert_permutation(&pool, &order);
            assert_cooldowns_honored(&order, GROUP_COOLDOWN_WINDOW);
        }
    }

    #[test]
    fn test_group_spacing_with_enough_groups() {
        // 6 niveaux de même taille : chaque niveau revient exactement tous les 6 tirages
        let pool = make_pool(&[
            ("1", "A", 3),
            ("2", "A", 3),
            ("3", "A", 3),
            ("4", "A", 3),
            ("5", "A", 3),
            ("6", "A", 3),
        ]);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let order = select(pool.clone(), &mut rng);
            for i in 0..order.len() {
                for j in (i + 1)..order.len().min(i + 1 + GROUP_COOLDOWN_WINDOW) {
                    assert_ne!(
                        order[i].group, order[j].group,
                        "niveau {} répété aux positions {i} et {j}",
                        order[i].group
                    );
                }
            }
        }
    }

    #[test]
    fn test_two_groups_alternate() {
        let pool = make_pool(&[("1", "A", 3), ("1", "B", 3), ("2", "A", 3), ("2", "B", 3)]);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let order = select(pool.clone(), &mut rng);
            assert_eq!(order.len(), 12);
            assert!(
                order.windows(2).all(|w| w[0].group != w[1].group),
                "les deux niveaux doivent alterner: {:?}",
                order.iter().map(|t| t.group).collect::<Vec<_>>()
            );
            assert_cooldowns_honored(&order, GROUP_COOLDOWN_WINDOW);
        }
    }

    #[test]
    fn test_subgroup_round_robin() {
        let pool = make_pool(&[("6e", "A", 2), ("6e", "B", 2), ("6e", "C", 2)]);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let order = select(pool.clone(), &mut rng);
            let rooms: Vec<&str> = order.iter().map(|t| t.subgroup).collect();
            let mut first_round = rooms[..3].to_vec();
            first_round.sort();
            assert_eq!(first_round, vec!["A", "B", "C"]);
            assert_eq!(rooms[..3], rooms[3..], "le second tour doit reprendre le même ordre de salles");
        }
    }

    #[test]
    fn test_orders_vary_between_runs() {
        let pool = make_pool(&[("6e", "A", 5), ("6e", "B", 5), ("5e", "A", 5), ("4e", "A", 5)]);
        let orders: Vec<Vec<usize>> = (0..20)
            .map(|seed| ids(&select(pool.clone(), &mut StdRng::seed_from_u64(seed))))
            .collect();
        assert!(orders.iter().any(|o| o != &orders[0]), "l'ordre ne devrait pas être figé");
    }

    #[test]
    fn test_seed_determinism() {
        let pool = make_pool(&[("6e", "A", 3), ("6e", "B", 3), ("5e", "A", 4)]);
        let a = select(pool.clone(), &mut StdRng::seed_from_u64(42));
        let b = select(pool, &mut StdRng::seed_from_u64(42));
        assert_eq!(ids(&a), ids(&b));
    }

    #[test]
    fn test_custom_group_cooldown() {
        let selector = FairSelector::with_group_cooldown(2);
        assert_eq!(selector.group_cooldown(), 2);

        let pool = make_pool(&[("1", "A", 4), ("2", "A", 4), ("3", "A", 4)]);
        for seed in 0..20 {
            let order = selector.order(pool.clone(), &mut StdRng::seed_from_u64(seed));
            assert_permutation(&pool, &order);
            assert_cooldowns_honored(&order, 2);
            for w in order.windows(3) {
                assert!(w[0].group != w[1].group && w[0].group != w[2].group && w[1].group != w[2].group);
            }
        }
    }

    #[test]
    fn test_empty_keys_are_grouped_together() {
        let pool = make_pool(&[("", "", 3), ("6e", "A", 2)]);
        let order = select(pool.clone(), &mut StdRng::seed_from_u64(3));
        assert_permutation(&pool, &order);
        assert_cooldowns_honored(&order, GROUP_COOLDOWN_WINDOW);
    }

    #[test]
    fn test_participants_are_categorized() {
        let pool = vec![
            Participant::new("Alice", "6e", "A"),
            Participant::new("Bruno", "6e", "B"),
            Participant::new("Chloé", "5e", "A"),
        ];
        let order = select(pool.clone(), &mut StdRng::seed_from_u64(7));
        assert_eq!(order.len(), 3);
        for p in &pool {
            assert!(order.contains(p));
        }
    }
}
