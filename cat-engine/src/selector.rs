// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Maximum-information item selection for a single CAT dimension.
//!
//! Stateless: takes the pool and the administered set as arguments rather
//! than owning either, so a session's mutable state stays local to the
//! session (see `session.rs`).

use crate::irt::fisher_information;
use crate::item::{Dimension, Item};
use std::collections::HashSet;

/// Down-weight applied to an uncalibrated item's raw Fisher information so
/// it is only preferred over a calibrated alternative when its true
/// information is meaningfully higher.
const PRELIMINARY_DISCOUNT: f64 = 0.5;

/// Select the next item to administer for `dimension` at ability `theta`,
/// from `pool`, excluding ids already in `administered`.
///
/// Ties in adjusted information are broken by first-seen order in `pool` —
/// the fixed, documented tie-break rule (§9 Open Question).
pub fn select_next<'a>(
    theta: f64,
    pool: &'a [Item],
    administered: &HashSet<String>,
    dimension: Dimension,
) -> Option<&'a Item> {
    let mut best: Option<(&Item, f64)> = None;

    for item in pool {
        if item.dimension != dimension || administered.contains(&item.id) {
            continue;
        }

        let raw_information = fisher_information(theta, item.alpha, item.beta, item.gamma);
        let adjusted = if item.is_preliminary {
            raw_information * PRELIMINARY_DISCOUNT
        } else {
            raw_information
        };

        match best {
            Some((_, best_score)) if adjusted <= best_score => {}
            _ => best = Some((item, adjusted)),
        }
    }

    best.map(|(item, _)| item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemInput;

    fn item(id: &str, dim: Dimension, alpha: f64, beta: f64, preliminary: bool) -> Item {
        Item::new(
            id,
            dim,
            alpha,
            beta,
            0.0,
            preliminary,
            ItemInput::simple("x"),
            vec![],
        )
    }

    #[test]
    fn never_returns_administered_item() {
        let pool = vec![
            item("a", Dimension::Security, 1.0, 0.0, false),
            item("b", Dimension::Security, 2.0, 0.0, false),
        ];
        let mut administered = HashSet::new();
        administered.insert("b".to_string());

        let picked = select_next(0.0, &pool, &administered, Dimension::Security).unwrap();
        assert_eq!(picked.id, "a");
    }

    #[test]
    fn returns_none_for_empty_candidate_set() {
        let pool = vec![item("a", Dimension::Security, 1.0, 0.0, false)];
        let administered = HashSet::new();
        assert!(select_next(0.0, &pool, &administered, Dimension::Fairness).is_none());
    }

    #[test]
    fn only_returns_requested_dimension() {
        let pool = vec![
            item("a", Dimension::Security, 1.0, 0.0, false),
            item("b", Dimension::Fairness, 5.0, 0.0, false),
        ];
        let administered = HashSet::new();
        let picked = select_next(0.0, &pool, &administered, Dimension::Security).unwrap();
        assert_eq!(picked.id, "a");
    }

    #[test]
    fn preliminary_items_are_discounted() {
        // Same alpha/beta: calibrated item should win because the
        // preliminary one's raw information is halved.
        let pool = vec![
            item("calibrated", Dimension::Security, 2.0, 0.0, false),
            item("preliminary", Dimension::Security, 2.0, 0.0, true),
        ];
        let administered = HashSet::new();
        let picked = select_next(0.0, &pool, &administered, Dimension::Security).unwrap();
        assert_eq!(picked.id, "calibrated");
    }

    #[test]
    fn preliminary_wins_when_its_raw_information_is_high_enough() {
        // Preliminary item's raw info must be > 2x calibrated's to win after
        // the 0.5 discount. Use a much higher alpha for the preliminary item.
        let pool = vec![
            item("calibrated", Dimension::Security, 1.0, 0.0, false),
            item("preliminary", Dimension::Security, 10.0, 0.0, true),
        ];
        let administered = HashSet::new();
        let picked = select_next(0.0, &pool, &administered, Dimension::Security).unwrap();
        assert_eq!(picked.id, "preliminary");
    }

    #[test]
    fn ties_break_by_first_seen_order() {
        let pool = vec![
            item("first", Dimension::Security, 2.0, 0.0, false),
            item("second", Dimension::Security, 2.0, 0.0, false),
        ];
        let administered = HashSet::new();
        let picked = select_next(0.0, &pool, &administered, Dimension::Security).unwrap();
        assert_eq!(picked.id, "first");
    }

    #[test]
    fn deterministic_across_repeated_calls() {
        let pool = vec![
            item("a", Dimension::Security, 1.3, 0.1, false),
            item("b", Dimension::Security, 1.7, -0.2, false),
            item("c", Dimension::Security, 0.9, 0.4, true),
        ];
        let administered = HashSet::new();
        let first = select_next(0.3, &pool, &administered, Dimension::Security).map(|i| i.id.clone());
        let second = select_next(0.3, &pool, &administered, Dimension::Security).map(|i| i.id.clone());
        assert_eq!(first, second);
    }

    use proptest::prelude::*;

    /// A randomly generated pool of items, all in `dimension`, with varied
    /// discrimination/difficulty/preliminary flags.
    fn item_pool(dimension: Dimension) -> impl Strategy<Value = Vec<Item>> {
        prop::collection::vec((0.1f64..5.0, -4.0f64..4.0, any::<bool>()), 1..12).prop_map(
            move |params| {
                params
                    .iter()
                    .enumerate()
                    .map(|(i, &(alpha, beta, preliminary))| {
                        item(&format!("item-{i}"), dimension, alpha, beta, preliminary)
                    })
                    .collect()
            },
        )
    }

    proptest! {
        /// Selector laws, §8: never returns an item already in `administered`.
        #[test]
        fn never_returns_an_administered_item(
            pool in item_pool(Dimension::Security),
            administered_fraction in 0.0f64..1.0,
        ) {
            let administered: HashSet<String> = pool
                .iter()
                .enumerate()
                .filter(|(i, _)| (*i as f64 / pool.len() as f64) < administered_fraction)
                .map(|(_, item)| item.id.clone())
                .collect();

            if let Some(picked) = select_next(0.0, &pool, &administered, Dimension::Security) {
                prop_assert!(!administered.contains(&picked.id));
            }
        }

        /// Selector laws, §8: returns an item of the requested dimension or
        /// `None`.
        #[test]
        fn returns_requested_dimension_or_none(pool in item_pool(Dimension::Fairness)) {
            let administered = HashSet::new();
            let picked = select_next(0.0, &pool, &administered, Dimension::Fairness);
            if let Some(item) = picked {
                prop_assert_eq!(item.dimension, Dimension::Fairness);
            }
        }

        /// Selector laws, §8: deterministic given equal inputs.
        #[test]
        fn deterministic_given_equal_inputs(
            pool in item_pool(Dimension::Robustness),
            theta in -4.0f64..4.0,
        ) {
            let administered = HashSet::new();
            let first = select_next(theta, &pool, &administered, Dimension::Robustness).map(|i| i.id.clone());
            let second = select_next(theta, &pool, &administered, Dimension::Robustness).map(|i| i.id.clone());
            prop_assert_eq!(first, second);
        }

        /// Selector laws, §8: a calibrated item is preferred over a
        /// preliminary one whenever the preliminary item's unadjusted
        /// information is less than 2x the calibrated item's (i.e. the
        /// calibrated item's raw info is >= 50% of the preliminary one's).
        #[test]
        fn calibrated_wins_when_its_share_of_raw_information_is_high_enough(
            calibrated_alpha in 0.5f64..5.0,
            preliminary_alpha in 0.5f64..5.0,
        ) {
            let pool = vec![
                item("calibrated", Dimension::Security, calibrated_alpha, 0.0, false),
                item("preliminary", Dimension::Security, preliminary_alpha, 0.0, true),
            ];
            let administered = HashSet::new();
            let theta = 0.0;

            let calibrated_raw = fisher_information(theta, calibrated_alpha, 0.0, 0.0);
            let preliminary_raw = fisher_information(theta, preliminary_alpha, 0.0, 0.0);

            let picked = select_next(theta, &pool, &administered, Dimension::Security).unwrap();
            if calibrated_raw >= 0.5 * preliminary_raw {
                prop_assert_eq!(picked.id, "calibrated");
            }
        }
    }
}
