//! Time-of-day visibility for menu categories.
//!
//! A category may carry a daily window in minutes since local midnight.
//! Windows with `start > end` wrap past midnight (22:00-02:00). Both bounds
//! are inclusive, so `start == end` is a one-minute window. Items inherit
//! visibility from their category; uncategorized items are always shown.

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use std::collections::HashSet;

use crate::routes::category::model::Category;
use crate::routes::item::model::MenuItem;

fn window_contains(start: u16, end: u16, now_minutes: u16) -> bool {
    if start <= end {
        start <= now_minutes && now_minutes <= end
    } else {
        // overnight window
        now_minutes >= start || now_minutes <= end
    }
}

fn category_visible_at(category: &Category, now_minutes: u16) -> bool {
    match category.visibility_window() {
        Some((start, end)) => window_contains(start, end, now_minutes),
        None => true,
    }
}

fn minutes_since_midnight(now: DateTime<Utc>, tz: FixedOffset) -> u16 {
    let local = now.with_timezone(&tz);
    (local.hour() * 60 + local.minute()) as u16
}

/// Filter `categories` and `items` down to what is visible at `now` in the
/// menu's timezone, preserving order. An item pointing at a category id that
/// is not in `categories` is hidden, while an item with no category at all
/// is shown.
pub fn compute_visibility(
    categories: Vec<Category>,
    items: Vec<MenuItem>,
    now: DateTime<Utc>,
    tz: FixedOffset,
) -> (Vec<Category>, Vec<MenuItem>) {
    let now_minutes = minutes_since_midnight(now, tz);

    let visible_categories: Vec<Category> = categories
        .into_iter()
        .filter(|c| category_visible_at(c, now_minutes))
        .collect();

    let visible_ids: HashSet<&str> = visible_categories
        .iter()
        .map(|c| c.category_id.as_str())
        .collect();

    let visible_items: Vec<MenuItem> = items
        .into_iter()
        .filter(|item| match item.category_id.as_deref() {
            None => true,
            Some(id) => visible_ids.contains(id),
        })
        .collect();

    (visible_categories, visible_items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;
    use std::collections::HashMap;

    fn category(id: &str, window: Option<(i16, i16)>) -> Category {
        Category {
            category_id: id.to_string(),
            restaurant_id: "r1".to_string(),
            display_name: Json(HashMap::from([("en".to_string(), id.to_string())])),
            sort_order: 0,
            visible_from: window.map(|(start, _)| start),
            visible_until: window.map(|(_, end)| end),
            created_at: Utc::now(),
        }
    }

    fn item(id: &str, category_id: Option<&str>) -> MenuItem {
        MenuItem {
            item_id: id.to_string(),
            restaurant_id: "r1".to_string(),
            category_id: category_id.map(str::to_string),
            display_name: Json(HashMap::from([("en".to_string(), id.to_string())])),
            allergens: vec![],
            price_cents: 950,
            is_available: true,
            sort_order: 0,
            created_at: Utc::now(),
        }
    }

    fn visible_at(cat: &Category, now_minutes: u16) -> bool {
        category_visible_at(cat, now_minutes)
    }

    #[test]
    fn same_day_window_bounds_are_inclusive() {
        let cat = category("lunch", Some((540, 720)));
        assert!(visible_at(&cat, 540));
        assert!(visible_at(&cat, 600));
        assert!(visible_at(&cat, 720));
        assert!(!visible_at(&cat, 539));
        assert!(!visible_at(&cat, 721));
    }

    #[test]
    fn overnight_window_wraps_past_midnight() {
        let cat = category("late-night", Some((1320, 120)));
        assert!(visible_at(&cat, 1320));
        assert!(visible_at(&cat, 0));
        assert!(visible_at(&cat, 120));
        assert!(!visible_at(&cat, 121));
        assert!(!visible_at(&cat, 1319));
    }

    #[test]
    fn degenerate_window_is_a_single_minute() {
        let cat = category("flash", Some((600, 600)));
        assert!(visible_at(&cat, 600));
        assert!(!visible_at(&cat, 599));
        assert!(!visible_at(&cat, 601));
    }

    #[test]
    fn no_window_means_always_visible() {
        let cat = category("drinks", None);
        for minute in 0..1440 {
            assert!(visible_at(&cat, minute));
        }
    }

    #[test]
    fn items_inherit_visibility_from_their_category() {
        // 12:00 UTC: "lunch" (09:00-15:00) is open, "breakfast" (06:00-10:00) is not
        let categories = vec![
            category("lunch", Some((540, 900))),
            category("breakfast", Some((360, 600))),
        ];
        let items = vec![
            item("soup", Some("lunch")),
            item("eggs", Some("breakfast")),
            item("water", None),
            item("ghost", Some("deleted-category")),
        ];

        let noon = Utc::now().date_naive().and_hms_opt(12, 0, 0).unwrap().and_utc();
        let tz = FixedOffset::east_opt(0).unwrap();
        let (visible_categories, visible_items) =
            compute_visibility(categories, items, noon, tz);

        let category_ids: Vec<&str> = visible_categories
            .iter()
            .map(|c| c.category_id.as_str())
            .collect();
        let item_ids: Vec<&str> = visible_items.iter().map(|i| i.item_id.as_str()).collect();

        assert_eq!(category_ids, vec!["lunch"]);
        assert_eq!(item_ids, vec!["soup", "water"]);
    }

    #[test]
    fn timezone_offset_shifts_the_local_minute() {
        // 23:30 UTC is 01:30 at +02:00, inside a 22:00-02:00 window either way,
        // but outside a 09:00-12:00 lunch window only in one of them
        let late = category("late", Some((1320, 120)));
        let lunch = category("lunch", Some((540, 720)));

        let half_past_eleven = Utc::now()
            .date_naive()
            .and_hms_opt(23, 30, 0)
            .unwrap()
            .and_utc();
        let utc = FixedOffset::east_opt(0).unwrap();
        let plus_twelve = FixedOffset::east_opt(12 * 3600).unwrap();

        let (visible_utc, _) =
            compute_visibility(vec![late.clone(), lunch.clone()], vec![], half_past_eleven, utc);
        assert_eq!(visible_utc.len(), 1);
        assert_eq!(visible_utc[0].category_id, "late");

        // 23:30 UTC is 11:30 at +12:00
        let (visible_east, _) =
            compute_visibility(vec![late, lunch], vec![], half_past_eleven, plus_twelve);
        assert_eq!(visible_east.len(), 1);
        assert_eq!(visible_east[0].category_id, "lunch");
    }

    #[test]
    fn empty_inputs_produce_empty_outputs() {
        let (categories, items) = compute_visibility(
            vec![],
            vec![item("water", None)],
            Utc::now(),
            FixedOffset::east_opt(0).unwrap(),
        );
        assert!(categories.is_empty());
        assert_eq!(items.len(), 1);

        let (categories, items) = compute_visibility(
            vec![],
            vec![],
            Utc::now(),
            FixedOffset::east_opt(0).unwrap(),
        );
        assert!(categories.is_empty());
        assert!(items.is_empty());
    }
}
