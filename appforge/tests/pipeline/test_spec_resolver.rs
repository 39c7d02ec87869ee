//! Spec resolution from loosely-structured UI plans

use appforge::artifacts::resolve;
use appforge::artifacts::spec_resolver::default_specs;
use appforge::types::{ArtifactKind, PlanComponent, UiPlan};

fn kinds(plan: &UiPlan) -> Vec<(String, ArtifactKind)> {
    resolve(plan).into_iter().map(|s| (s.name, s.kind)).collect()
}

#[test]
fn test_auth_only_plan_falls_back_to_default_triple() {
    let plan = UiPlan::with_components(["LoginForm"]);
    let specs = resolve(&plan);

    assert_eq!(specs, default_specs());
    assert_eq!(
        kinds(&plan),
        vec![
            ("Header".to_string(), ArtifactKind::Navigation),
            ("MainContent".to_string(), ArtifactKind::Generic),
            ("Footer".to_string(), ArtifactKind::Footer),
        ]
    );
}

#[test]
fn test_navigation_without_footer_gets_one() {
    let plan = UiPlan::with_components(["NavigationHeader", "Dashboard"]);
    assert_eq!(
        kinds(&plan),
        vec![
            ("NavigationHeader".to_string(), ArtifactKind::Navigation),
            ("Dashboard".to_string(), ArtifactKind::Generic),
            ("Footer".to_string(), ArtifactKind::Footer),
        ]
    );
}

#[test]
fn test_declared_footer_is_not_duplicated() {
    let plan = UiPlan::with_components(["TopNav", "SiteFooter"]);
    let specs = resolve(&plan);
    assert_eq!(specs.len(), 2);
    assert_eq!(specs[1].kind, ArtifactKind::Footer);
}

#[test]
fn test_root_container_entries_are_dropped() {
    let plan = UiPlan::with_components(["App", "MainContainer", "StatsChart"]);
    let names: Vec<String> = resolve(&plan).into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["StatsChart".to_string()]);
}

#[test]
fn test_resolution_is_deterministic_and_never_empty() {
    let plans = vec![
        UiPlan::default(),
        UiPlan::with_components(Vec::<String>::new()),
        UiPlan::with_components(["", "   ", "SignUp", "Register", "App"]),
        UiPlan::with_components(["Sidebar", "UserTable", "EditProfileModal", "Sidebar"]),
        UiPlan {
            components: Some(vec![PlanComponent::Detailed {
                name: "activity feed".to_string(),
                description: None,
            }]),
            ..Default::default()
        },
    ];

    for plan in &plans {
        let first = resolve(plan);
        assert!(!first.is_empty(), "empty resolution for {:?}", plan);
        assert_eq!(first, resolve(plan));
    }

    assert_eq!(
        kinds(&plans[3]),
        vec![
            ("Sidebar".to_string(), ArtifactKind::Sidebar),
            ("UserTable".to_string(), ArtifactKind::DataDisplay),
            ("EditProfileModal".to_string(), ArtifactKind::Modal),
        ]
    );
    assert_eq!(kinds(&plans[4])[0].0, "ActivityFeed");
}
