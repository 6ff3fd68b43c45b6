use crate::domain::model::{Athlete, EntityId, ALL_CATEGORIES};
use serde::Serialize;
use std::collections::HashSet;

/// Name search plus category pill, applied locally to the loaded athletes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AthleteFilter {
    pub query: String,
    pub category: String,
}

impl Default for AthleteFilter {
    fn default() -> Self {
        Self {
            query: String::new(),
            category: ALL_CATEGORIES.to_string(),
        }
    }
}

impl AthleteFilter {
    pub fn new(query: impl Into<String>, category: Option<&str>) -> Self {
        Self {
            query: query.into(),
            category: category.unwrap_or(ALL_CATEGORIES).to_string(),
        }
    }

    pub fn matches(&self, athlete: &Athlete) -> bool {
        if !self.category.eq_ignore_ascii_case(ALL_CATEGORIES) {
            let wanted = self.category.to_lowercase();
            match &athlete.category {
                Some(category) if category.to_lowercase() == wanted => {}
                _ => return false,
            }
        }

        if !self.query.is_empty() {
            return athlete
                .name
                .to_lowercase()
                .contains(&self.query.to_lowercase());
        }

        true
    }

    pub fn apply<'a>(&self, athletes: &'a [Athlete]) -> Vec<&'a Athlete> {
        athletes.iter().filter(|a| self.matches(a)).collect()
    }
}

/// Ids of the athletes the signed-in user follows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FollowSet {
    ids: HashSet<EntityId>,
}

impl FollowSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_athletes(athletes: &[Athlete]) -> Self {
        Self {
            ids: athletes.iter().map(|a| a.id.clone()).collect(),
        }
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.ids.contains(id)
    }

    /// Flips membership and reports whether `id` was followed before the flip.
    pub fn toggle(&mut self, id: &EntityId) -> bool {
        if self.ids.remove(id) {
            true
        } else {
            self.ids.insert(id.clone());
            false
        }
    }

    pub fn snapshot(&self) -> FollowSet {
        self.clone()
    }

    pub fn restore(&mut self, snapshot: FollowSet) {
        *self = snapshot;
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Everything the search and orbit screens need: all athletes plus who is followed.
#[derive(Debug, Clone, Default)]
pub struct CatalogView {
    pub athletes: Vec<Athlete>,
    pub followed: FollowSet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AthleteRow {
    pub id: EntityId,
    pub name: String,
    pub category: String,
    pub avatar_url: String,
    pub following: bool,
}

impl CatalogView {
    pub fn search(&self, filter: &AthleteFilter) -> Vec<AthleteRow> {
        filter
            .apply(&self.athletes)
            .into_iter()
            .map(|athlete| self.row(athlete, athlete.display_category("Athlete")))
            .collect()
    }

    /// Followed athletes only, labelled by sport.
    pub fn orbit(&self, filter: &AthleteFilter) -> Vec<AthleteRow> {
        filter
            .apply(&self.athletes)
            .into_iter()
            .filter(|athlete| self.followed.contains(&athlete.id))
            .map(|athlete| self.row(athlete, athlete.sport("Sport")))
            .collect()
    }

    fn row(&self, athlete: &Athlete, category: &str) -> AthleteRow {
        AthleteRow {
            id: athlete.id.clone(),
            name: athlete.name.clone(),
            category: category.to_string(),
            avatar_url: athlete.avatar_url().to_string(),
            following: self.followed.contains(&athlete.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn athlete(id: &str, name: &str, category: Option<&str>) -> Athlete {
        Athlete {
            id: EntityId::from(id),
            name: name.to_string(),
            category: category.map(str::to_string),
            subcategory: None,
            image_url: None,
        }
    }

    fn roster() -> Vec<Athlete> {
        vec![
            athlete("1", "Carlos Alcaraz", Some("Tennis")),
            athlete("2", "Lewis Hamilton", Some("f1")),
            athlete("3", "Coco Gauff", Some("tennis")),
            athlete("4", "Nikola Jokic", Some("basketball")),
            athlete("5", "Mystery Runner", None),
        ]
    }

    #[test]
    fn test_default_filter_keeps_everything() {
        let athletes = roster();
        assert_eq!(AthleteFilter::default().apply(&athletes).len(), 5);
    }

    #[test]
    fn test_filter_by_category_is_case_insensitive() {
        let athletes = roster();
        let filter = AthleteFilter::new("", Some("TENNIS"));
        let names: Vec<&str> = filter.apply(&athletes).iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Carlos Alcaraz", "Coco Gauff"]);
    }

    #[test]
    fn test_filter_by_name_and_category() {
        let athletes = roster();
        let filter = AthleteFilter::new("co", Some("tennis"));
        let names: Vec<&str> = filter.apply(&athletes).iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Coco Gauff"]);

        let filter = AthleteFilter::new("HAM", None);
        assert_eq!(filter.apply(&athletes).len(), 1);
    }

    #[test]
    fn test_missing_category_only_matches_all() {
        let athletes = roster();
        let filter = AthleteFilter::new("mystery", Some("tennis"));
        assert!(filter.apply(&athletes).is_empty());

        let filter = AthleteFilter::new("mystery", None);
        assert_eq!(filter.apply(&athletes).len(), 1);
    }

    #[test]
    fn test_follow_set_toggle_and_restore() {
        let mut follows = FollowSet::from_athletes(&roster()[..1]);
        let alcaraz = EntityId::from("1");
        let gauff = EntityId::from("3");

        let before = follows.snapshot();
        assert!(follows.toggle(&alcaraz));
        assert!(!follows.contains(&alcaraz));

        assert!(!follows.toggle(&gauff));
        assert!(follows.contains(&gauff));

        follows.restore(before);
        assert!(follows.contains(&alcaraz));
        assert!(!follows.contains(&gauff));
        assert_eq!(follows.len(), 1);
    }

    #[test]
    fn test_search_marks_followed_rows() {
        let athletes = roster();
        let view = CatalogView {
            followed: FollowSet::from_athletes(&athletes[1..2]),
            athletes,
        };

        let rows = view.search(&AthleteFilter::default());
        assert_eq!(rows.len(), 5);
        assert!(rows[1].following);
        assert!(!rows[0].following);
        assert_eq!(rows[4].category, "Athlete");
    }

    #[test]
    fn test_orbit_lists_followed_by_sport() {
        let athletes = roster();
        let view = CatalogView {
            followed: FollowSet::from_athletes(&[athletes[1].clone(), athletes[4].clone()]),
            athletes,
        };

        let rows = view.orbit(&AthleteFilter::default());
        let labels: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.name.as_str(), r.category.as_str()))
            .collect();
        assert_eq!(labels, vec![("Lewis Hamilton", "f1"), ("Mystery Runner", "Sport")]);
        assert!(rows.iter().all(|r| r.following));

        assert!(view.orbit(&AthleteFilter::new("", Some("tennis"))).is_empty());
    }
}
