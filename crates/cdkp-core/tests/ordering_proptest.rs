//! Property tests for phase ordering and structural determinism

use cdkp_core::prelude::*;
use cdkp_graph::{SOURCE_STAGE, SYNTH_STAGE};
use cdkp_test_utils::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Call {
    Stage,
    Group,
    IntoGroup(usize),
}

fn call() -> impl Strategy<Value = Call> {
    prop_oneof![
        3 => Just(Call::Stage),
        1 => Just(Call::Group),
        2 => (0..8usize).prop_map(Call::IntoGroup),
    ]
}

/// Replay `calls`, returning the pipeline and the expected top-level names
fn replay(calls: &[Call]) -> (CdkPipeline, Vec<String>) {
    let (pipeline, _backend) = setup_test_pipeline();
    let mut groups: Vec<DeploymentGroup> = Vec::new();
    let mut expected = vec![SOURCE_STAGE.to_string(), SYNTH_STAGE.to_string()];

    for (i, c) in calls.iter().enumerate() {
        match c {
            Call::Stage => {
                let name = format!("Stage{i}");
                pipeline
                    .add_application_stage(app_stage(&name), AddApplicationOptions::new())
                    .unwrap();
                expected.push(name);
            }
            Call::Group => {
                let name = format!("Group{i}");
                groups.push(pipeline.add_deployment_group(name.as_str()).unwrap());
                expected.push(name);
            }
            Call::IntoGroup(g) => {
                if let Some(group) = groups.get(g % groups.len().max(1)) {
                    group
                        .add_application_stage(app_stage(&format!("Member{i}")), AddApplicationOptions::new())
                        .unwrap();
                }
            }
        }
    }
    (pipeline, expected)
}

proptest! {
    #[test]
    fn prop_top_level_order_is_call_order(calls in proptest::collection::vec(call(), 0..24)) {
        let (pipeline, expected) = replay(&calls);
        let graph = pipeline.graph();

        // Invariant: reserved stages first, then one phase per stage/group call in call order
        prop_assert_eq!(phase_names(&graph), expected);
    }

    #[test]
    fn prop_group_position_fixed_at_creation(calls in proptest::collection::vec(call(), 0..24)) {
        let (pipeline, _) = replay(&calls);
        let graph = pipeline.graph();

        let mut position = 2;
        for (i, c) in calls.iter().enumerate() {
            match c {
                Call::Stage => position += 1,
                Call::Group => {
                    prop_assert_eq!(graph.children()[position].name(), format!("Group{i}"));
                    position += 1;
                }
                Call::IntoGroup(_) => {}
            }
        }
    }

    #[test]
    fn prop_same_declarations_same_structure(calls in proptest::collection::vec(call(), 0..16)) {
        let (first, _) = replay(&calls);
        let (second, _) = replay(&calls);
        prop_assert_eq!(first.graph(), second.graph());
    }

    #[test]
    fn prop_every_mutation_fails_after_render(calls in proptest::collection::vec(call(), 0..8)) {
        let (pipeline, _) = replay(&calls);
        pipeline.render_to_backend().unwrap();
        let rendered = pipeline.graph();

        prop_assert!(pipeline
            .add_application_stage(app_stage("Late"), AddApplicationOptions::new())
            .is_err());
        prop_assert!(pipeline.add_deployment_group("Late").is_err());
        prop_assert!(matches!(pipeline.render_to_backend(), Err(PipelineError::AlreadyBuilt)));
        prop_assert_eq!(pipeline.graph(), rendered);
    }
}
