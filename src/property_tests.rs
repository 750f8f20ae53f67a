//! Property-based tests for the statistics aggregation

#[cfg(test)]
mod tests {
    use crate::analytics::{aggregate, daily_trend, DashboardFilter, RECENT_INCIDENTS};
    use crate::incidents::{Incident, Priority, Status};
    use crate::testing::fixtures::IncidentBuilder;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    const TEAMS: [&str; 4] = ["Ops", "Network", "Database", ""];
    const PLATFORMS: [&str; 3] = ["Production", "Staging", "Mobile"];

    prop_compose! {
        fn arb_incident()(
            id in "[a-z0-9]{8}",
            priority in 0usize..5,
            status in 0usize..4,
            team in 0usize..TEAMS.len(),
            platform in 0usize..PLATFORMS.len(),
            created_minutes in 0i64..(60 * 24 * 90),
            resolution_minutes in prop::option::of(-240i64..(60 * 24 * 14)),
        ) -> Incident {
            let created = IncidentBuilder::epoch() + Duration::minutes(created_minutes);
            let mut builder = IncidentBuilder::new(&id)
                .priority(Priority::ALL[priority])
                .status(Status::ALL[status])
                .team(TEAMS[team])
                .platform(PLATFORMS[platform])
                .created_at(created);
            if let Some(minutes) = resolution_minutes {
                builder = builder.resolved_after_minutes(minutes);
            }
            builder.build()
        }
    }

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    // Property test: distributions partition the input
    proptest! {
        #[test]
        fn test_distributions_sum_to_total(
            incidents in prop::collection::vec(arb_incident(), 1..60),
        ) {
            let stats = aggregate(&incidents, now());

            prop_assert_eq!(stats.total_incidents, incidents.len());
            prop_assert_eq!(stats.priority_distribution.len(), 5);
            prop_assert_eq!(stats.status_distribution.len(), 4);
            prop_assert_eq!(
                stats.priority_distribution.iter().map(|p| p.count).sum::<usize>(),
                incidents.len()
            );
            prop_assert_eq!(
                stats.status_distribution.iter().map(|s| s.count).sum::<usize>(),
                incidents.len()
            );
            prop_assert_eq!(
                stats.team_stats.iter().map(|t| t.incidents).sum::<usize>(),
                incidents.len()
            );
        }
    }

    // Property test: rates are percentages and critical counts are bounded
    proptest! {
        #[test]
        fn test_rates_are_bounded(
            incidents in prop::collection::vec(arb_incident(), 0..60),
        ) {
            let stats = aggregate(&incidents, now());

            prop_assert!((0.0..=100.0).contains(&stats.resolution_rate));
            prop_assert!(stats.critical_incidents <= stats.priority_count(Priority::P0));
            for team in &stats.team_stats {
                prop_assert!(team.resolved <= team.incidents);
                prop_assert!((0.0..=100.0).contains(&team.resolution_rate));
                if team.resolved == 0 {
                    prop_assert_eq!(team.mttr, 0.0);
                }
            }

            let resolved = incidents.iter().filter(|i| i.resolved_at.is_some()).count();
            if resolved == 0 {
                prop_assert_eq!(stats.mttr, 0.0);
            }
        }
    }

    // Property test: team rollups follow first appearance and never repeat
    proptest! {
        #[test]
        fn test_team_order_is_first_seen(
            incidents in prop::collection::vec(arb_incident(), 0..60),
        ) {
            let stats = aggregate(&incidents, now());

            let mut expected: Vec<&str> = Vec::new();
            for incident in &incidents {
                if !expected.contains(&incident.intervening_team.as_str()) {
                    expected.push(&incident.intervening_team);
                }
            }
            let actual: Vec<&str> = stats.team_stats.iter().map(|t| t.name.as_str()).collect();
            prop_assert_eq!(actual, expected);
        }
    }

    // Property test: recent incidents are a prefix of the input
    proptest! {
        #[test]
        fn test_recent_is_input_prefix(
            incidents in prop::collection::vec(arb_incident(), 0..20),
        ) {
            let stats = aggregate(&incidents, now());
            let limit = incidents.len().min(RECENT_INCIDENTS);
            prop_assert_eq!(&stats.recent_incidents[..], &incidents[..limit]);
        }
    }

    // Property test: trend buckets account for every filtered incident
    proptest! {
        #[test]
        fn test_trend_counts_match_filter(
            incidents in prop::collection::vec(arb_incident(), 0..60),
            platform in prop::option::of(0usize..PLATFORMS.len()),
        ) {
            let filter = DashboardFilter::new(
                platform.map(|p| PLATFORMS[p].to_string()),
                Default::default(),
            );
            let selected = filter.apply(&incidents, now());
            let trend = daily_trend(&selected);

            prop_assert_eq!(trend.iter().map(|p| p.total).sum::<usize>(), selected.len());
            prop_assert!(trend.windows(2).all(|w| w[0].date < w[1].date));
            for point in &trend {
                prop_assert_eq!(
                    point.platforms.iter().map(|p| p.count).sum::<usize>(),
                    point.total
                );
            }
        }
    }
}
