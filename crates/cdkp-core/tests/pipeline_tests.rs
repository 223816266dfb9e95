//! Orchestrator lifecycle tests
//!
//! Phase ordering, build-once immutability, and deployment group placement.

use cdkp_core::prelude::*;
use cdkp_core::{PublishPerDeployment, StageError};
use cdkp_graph::{tags, SOURCE_STAGE, SYNTH_STAGE};
use cdkp_test_utils::*;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn opts() -> AddApplicationOptions {
    AddApplicationOptions::new()
}

#[test]
fn source_and_synth_precede_user_phases() {
    let (pipeline, backend) = setup_test_pipeline();
    pipeline.add_application_stage(app_stage("A"), opts()).unwrap();
    pipeline.render_to_backend().unwrap();

    let graph = backend.last_graph().unwrap();
    assert_eq!(phase_names(&graph), vec![SOURCE_STAGE, SYNTH_STAGE, "A"]);
    assert_eq!(graph.source_stage().children()[0].name(), "Checkout");
    assert_eq!(graph.synth_stage().children()[0].name(), "Build");
}

#[test]
fn reserved_stages_exist_without_sources() {
    let backend = RecordingBackend::new();
    let pipeline = CdkPipeline::new(
        "Pipeline",
        CdkPipelineProps::new(StaticSynth::default()).with_backend(backend.clone()),
    )
    .unwrap();
    pipeline.render_to_backend().unwrap();

    let graph = backend.last_graph().unwrap();
    assert_eq!(phase_names(&graph), vec![SOURCE_STAGE, SYNTH_STAGE]);
    assert!(graph.source_stage().is_empty());
}

#[test]
fn sources_attach_in_declaration_order() {
    let pipeline = CdkPipeline::new(
        "Pipeline",
        CdkPipelineProps::new(StaticSynth::new(&["Install", "Test", "Synth"]))
            .with_source(StaticSource::new("App"))
            .with_source(StaticSource::new("Config"))
            .with_backend(RecordingBackend::new()),
    )
    .unwrap();

    let graph = pipeline.graph();
    let sources: Vec<&str> = graph.source_stage().children().iter().map(|c| c.name()).collect();
    let synth: Vec<&str> = graph.synth_stage().children().iter().map(|c| c.name()).collect();
    assert_eq!(sources, vec!["App", "Config"]);
    assert_eq!(synth, vec!["Install", "Test", "Synth"]);
    assert_eq!(graph.synth_stage().children()[0].tag("scope"), Some("Pipeline"));
}

#[test]
fn scenario_two_stages_in_call_order() {
    let (pipeline, backend) = setup_test_pipeline();
    pipeline.add_application_stage(app_stage("StageA"), opts()).unwrap();
    pipeline.add_application_stage(app_stage("StageB"), opts()).unwrap();
    pipeline.render_to_backend().unwrap();

    assert_eq!(
        phase_names(&backend.last_graph().unwrap()),
        vec![SOURCE_STAGE, SYNTH_STAGE, "StageA", "StageB"]
    );
}

#[test]
fn scenario_group_keeps_creation_position() {
    let (pipeline, backend) = setup_test_pipeline();
    let prod = pipeline.add_deployment_group("prod").unwrap();
    prod.add_application_stage(app_stage("StageC"), opts()).unwrap();
    pipeline.add_application_stage(app_stage("StageD"), opts()).unwrap();
    pipeline.render_to_backend().unwrap();

    let graph = backend.last_graph().unwrap();
    assert_eq!(phase_names(&graph), vec![SOURCE_STAGE, SYNTH_STAGE, "prod", "StageD"]);

    let group = graph.child("prod").unwrap();
    let members: Vec<&str> = group.children().iter().map(|c| c.name()).collect();
    assert_eq!(members, vec!["StageC"]);
}

#[test]
fn group_grows_after_later_top_level_phases() {
    let (pipeline, backend) = setup_test_pipeline();
    let prod = pipeline.add_deployment_group("prod").unwrap();
    pipeline.add_application_stage(app_stage("StageD"), opts()).unwrap();
    prod.add_application_stage(app_stage("Eu"), opts()).unwrap();
    prod.add_application_stage(app_stage("Us"), opts()).unwrap();
    pipeline.render_to_backend().unwrap();

    let graph = backend.last_graph().unwrap();
    assert_eq!(phase_names(&graph), vec![SOURCE_STAGE, SYNTH_STAGE, "prod", "StageD"]);
    let members: Vec<&str> = graph.child("prod").unwrap().children().iter().map(|c| c.name()).collect();
    assert_eq!(members, vec!["Eu", "Us"]);
    assert_eq!(prod.name(), "prod");
    assert_eq!(prod.phase_id().position(), 2);
}

#[test]
fn scenario_mutation_after_render_is_rejected() {
    let (pipeline, backend) = setup_test_pipeline();
    pipeline.add_application_stage(app_stage("StageA"), opts()).unwrap();
    pipeline.render_to_backend().unwrap();
    let rendered = backend.last_graph().unwrap();

    let err = pipeline.add_application_stage(app_stage("StageE"), opts()).unwrap_err();
    assert!(matches!(err, PipelineError::Immutable { .. }));
    assert!(err.is_lifecycle_violation());

    assert!(pipeline.is_built());
    assert_eq!(pipeline.graph(), rendered);
    assert_eq!(backend.last_graph().unwrap(), rendered);
    assert_eq!(backend.render_count(), 1);
}

#[test]
fn group_creation_after_render_is_rejected() {
    let (pipeline, _backend) = setup_test_pipeline();
    pipeline.render_to_backend().unwrap();

    let err = pipeline.add_deployment_group("late").unwrap_err();
    assert!(matches!(err, PipelineError::Immutable { .. }));
    assert_eq!(phase_names(&pipeline.graph()), vec![SOURCE_STAGE, SYNTH_STAGE]);
}

#[test]
fn double_render_is_rejected() {
    let (pipeline, backend) = setup_test_pipeline();
    pipeline.render_to_backend().unwrap();

    let err = pipeline.render_to_backend().unwrap_err();
    assert!(matches!(err, PipelineError::AlreadyBuilt));
    assert_eq!(err.to_string(), "can only render the pipeline once");
    assert_eq!(backend.render_count(), 1);
}

#[test]
fn sealed_group_rejects_after_render() {
    let (pipeline, backend) = setup_test_pipeline();
    let prod = pipeline.add_deployment_group("prod").unwrap();
    prod.add_application_stage(app_stage("StageC"), opts()).unwrap();
    pipeline.render_to_backend().unwrap();

    let err = prod.add_application_stage(app_stage("Late"), opts()).unwrap_err();
    assert!(matches!(err, PipelineError::Immutable { .. }));
    assert_eq!(pipeline.graph(), backend.last_graph().unwrap());
}

#[test]
fn unsealed_group_keeps_accepting_after_render() {
    let backend = RecordingBackend::new();
    let pipeline = CdkPipeline::new(
        "Pipeline",
        props_with(backend.clone()).with_config(PipelineConfig::new().with_sealed_groups(false)),
    )
    .unwrap();
    let prod = pipeline.add_deployment_group("prod").unwrap();
    pipeline.render_to_backend().unwrap();

    prod.add_application_stage(app_stage("Late"), opts()).unwrap();

    // the addition lands in the live graph but the backend never sees it
    let live = pipeline.graph();
    assert_eq!(live.child("prod").unwrap().len(), 1);
    assert!(backend.last_graph().unwrap().child("prod").unwrap().is_empty());
    assert_eq!(backend.render_count(), 1);

    // top-level mutation stays forbidden either way
    assert!(pipeline.add_application_stage(app_stage("Other"), opts()).is_err());
}

#[test]
fn finalize_renders_once() {
    let (pipeline, backend) = setup_test_pipeline();
    pipeline.finalize().unwrap();
    pipeline.finalize().unwrap();
    assert_eq!(backend.render_count(), 1);

    let (pipeline, backend) = setup_test_pipeline();
    pipeline.render_to_backend().unwrap();
    pipeline.finalize().unwrap();
    assert_eq!(backend.render_count(), 1);
}

#[test]
fn scoped_build_finalizes_on_exit() {
    let backend = RecordingBackend::new();
    let pipeline = CdkPipeline::build("Pipeline", props_with(backend.clone()), |p| {
        p.add_application_stage(app_stage("Beta"), opts())?;
        let prod = p.add_deployment_group("Prod")?;
        prod.add_application_stage(app_stage("Eu"), opts())
    })
    .unwrap();

    assert!(pipeline.is_built());
    assert_eq!(backend.render_count(), 1);
    assert_eq!(
        phase_names(&backend.last_graph().unwrap()),
        vec![SOURCE_STAGE, SYNTH_STAGE, "Beta", "Prod"]
    );
}

#[test]
fn scoped_build_respects_explicit_render() {
    let backend = RecordingBackend::new();
    CdkPipeline::build("Pipeline", props_with(backend.clone()), |p| p.render_to_backend()).unwrap();
    assert_eq!(backend.render_count(), 1);
}

#[test]
fn scoped_build_stops_on_error() {
    let backend = RecordingBackend::new();
    let err = CdkPipeline::build("Pipeline", props_with(backend.clone()), |p| {
        p.add_deployment(&FailingDeployment)
    })
    .unwrap_err();

    assert_eq!(err.to_string(), "deployment rejected");
    assert_eq!(backend.render_count(), 0);
}

#[test]
fn backend_receives_scope() {
    let backend = RecordingBackend::new();
    let scope = PipelineScope::new("Delivery").under("App/PipelineStack");
    let pipeline = CdkPipeline::with_scope(scope.clone(), props_with(backend.clone())).unwrap();
    pipeline.render_to_backend().unwrap();

    assert_eq!(backend.last_scope(), Some(scope));
    assert_eq!(pipeline.scope().path(), "App/PipelineStack/Delivery");
}

#[test]
fn collaborator_errors_propagate_unmodified() {
    let err = CdkPipeline::new(
        "Pipeline",
        CdkPipelineProps::new(StaticSynth::default()).with_source(FailingSource),
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "source unavailable");

    let err = CdkPipeline::new("Pipeline", CdkPipelineProps::new(FailingSynth)).unwrap_err();
    assert_eq!(err.to_string(), "synth misconfigured");
    assert!(!err.is_lifecycle_violation());
}

#[test]
fn failed_deployment_leaves_graph_untouched() {
    let (pipeline, _backend) = setup_test_pipeline();
    let before = pipeline.graph();

    assert!(pipeline.add_deployment(&FailingDeployment).is_err());
    assert_eq!(pipeline.graph(), before);

    let group = pipeline.add_deployment_group("prod").unwrap();
    assert!(group.add_deployment(&FailingDeployment).is_err());
    assert!(pipeline.graph().child("prod").unwrap().is_empty());
}

#[test]
fn invalid_stage_surfaces_stage_error() {
    let (pipeline, _backend) = setup_test_pipeline();
    let stage = ApplicationStage::new("Broken")
        .with_stack(StackArtifact::new("A").with_dependency("B"))
        .with_stack(StackArtifact::new("B").with_dependency("A"));

    let err = pipeline.add_application_stage(stage, opts()).unwrap_err();
    assert!(matches!(
        err.collaborator_error::<StageError>(),
        Some(StageError::CyclicStackDependencies { .. })
    ));
}

#[test]
fn backend_failure_is_fatal_to_that_call_only() {
    let backend = RecordingBackend::failing("quota exceeded");
    let pipeline = CdkPipeline::new("Pipeline", props_with(backend.clone())).unwrap();

    let err = pipeline.render_to_backend().unwrap_err();
    assert_eq!(err.to_string(), "quota exceeded");
    assert!(!pipeline.is_built());
    assert_eq!(backend.render_count(), 1);
}

#[test]
fn deployments_see_graph_as_assembled_so_far() {
    let (pipeline, _backend) = setup_test_pipeline();
    pipeline.add_application_stage(app_stage("Beta"), opts()).unwrap();
    let group = pipeline.add_deployment_group("prod").unwrap();

    let observer = ObservingDeployment::new("Probe");
    group.add_deployment(&observer).unwrap();
    assert_eq!(
        *observer.seen.lock(),
        vec![SOURCE_STAGE, SYNTH_STAGE, "Beta", "prod"]
    );
}

#[test]
fn prepublish_all_publishes_each_asset_once() {
    let (pipeline, backend) = setup_test_pipeline();
    let shared = ApplicationStage::new("Beta")
        .with_stack(StackArtifact::new("Api").with_asset(AssetRef::file("bundle")));
    let again = ApplicationStage::new("Prod")
        .with_stack(StackArtifact::new("Api").with_asset(AssetRef::file("bundle")));
    pipeline.add_application_stage(shared, opts()).unwrap();
    pipeline.add_application_stage(again, opts()).unwrap();
    pipeline.render_to_backend().unwrap();

    let graph = backend.last_graph().unwrap();
    let beta = graph.child("Beta").unwrap();
    let prod = graph.child("Prod").unwrap();
    assert!(beta.child("Assets").is_some());
    assert!(prod.child("Assets").is_none());

    let publishes = graph
        .walk()
        .into_iter()
        .filter(|(_, n)| n.has_tag(tags::ASSET_PUBLISHING))
        .count();
    assert_eq!(publishes, 1);
}

#[test]
fn per_deployment_policy_is_swappable() {
    let backend = RecordingBackend::new();
    let pipeline = CdkPipeline::new(
        "Pipeline",
        props_with(backend.clone()).with_asset_publishing(Arc::new(PublishPerDeployment::new())),
    )
    .unwrap();
    pipeline.add_application_stage(app_stage("Beta"), opts()).unwrap();
    pipeline.add_application_stage(app_stage("Beta2"), opts()).unwrap();
    pipeline.render_to_backend().unwrap();

    let graph = backend.last_graph().unwrap();
    let publishes = graph
        .walk()
        .into_iter()
        .filter(|(_, n)| n.has_tag(tags::ASSET_PUBLISHING))
        .count();
    assert_eq!(publishes, 2);
    assert!(graph.child("Beta").unwrap().child("Assets").is_none());
}
