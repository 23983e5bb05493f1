mod common;

use common::*;
use ibdm::kernel::audit::Diagnostic;
use ibdm::kernel::context::RuleContext;
use ibdm::kernel::plan::StepStatus;
use ibdm::kernel::select::{self, SelectionRuleId};
use ibdm::kernel::semantics::{Answer, DialogueMove, Icm, MoveTag, Proposition, Question, Speaker};
use ibdm::kernel::state::StateDelta;
use ibdm::kernel::update::{candidates, integrate, UpdateRuleId};
use ibdm::{DomainModel, EngineConfig, InformationState};

#[test]
fn test_ask_pushes_question_and_plan_subgoal_is_selected_first() {
    let domain = domain();
    let config = EngineConfig::default();
    let ctx = RuleContext::new(&domain, &config);

    // 1. Active plan with a pending findout for a different question
    let mut state = InformationState::new();
    state.set_plan(domain.plan_template("draft_nda").unwrap());

    // 2. User asks about the weather
    let mv = DialogueMove::ask(Speaker::User, weather());
    let integration = integrate(state, Some(mv), &ctx);
    assert_eq!(integration.rule, Some(UpdateRuleId::IntegrateAsk));
    let qud = integration.state.shared().qud();
    assert_eq!(qud.len(), 1, "QUD should hold exactly the asked question");
    assert_eq!(qud.peek(), Some(&weather()));

    // 3. Selection asks the plan's sub-goal, not the question just pushed
    let selection = select::select(integration.state, &ctx);
    assert_eq!(selection.rule, Some(SelectionRuleId::SelectFromPlan));
    let asked = selection.mv.expect("a move should be selected");
    assert_eq!(asked.question(), Some(&party()));
    assert_eq!(selection.state.shared().qud().peek(), Some(&party()));
}

#[test]
fn test_resolving_answer_pops_and_commits() {
    let domain = domain();
    let config = EngineConfig::default();
    let ctx = RuleContext::new(&domain, &config);

    let mut state = InformationState::new();
    state.push_qud(colour());

    let mv = DialogueMove::answer(Speaker::User, Answer::short("Red"));
    let integration = integrate(state, Some(mv), &ctx);

    assert_eq!(integration.rule, Some(UpdateRuleId::IntegrateAnswer));
    assert!(integration.state.shared().qud().is_empty(), "Resolved question should be popped");
    assert!(
        integration.state.shared().commitments().contains(&Proposition::new("colour", "red")),
        "Binding should use the canonical option spelling"
    );
    assert!(integration.state.control().awaiting_grounding());
}

#[test]
fn test_relevant_answer_pushes_residual_above_open_question() {
    let domain = domain();
    let config = EngineConfig::default();
    let ctx = RuleContext::new(&domain, &config);

    let mut state = InformationState::new();
    state.push_qud(colour());

    let mv = DialogueMove::answer(Speaker::User, Answer::short("blue"));
    let integration = integrate(state, Some(mv), &ctx);

    assert_eq!(integration.rule, Some(UpdateRuleId::IntegrateAnswer));
    let qud = integration.state.shared().qud();
    let residual = Question::alt_about("colour", ["light blue", "dark blue"]).unwrap();
    assert_eq!(qud.len(), 2);
    assert_eq!(qud.peek(), Some(&residual), "Residual sub-question should be on top");
    assert_eq!(qud.iter().nth(1), Some(&colour()), "Original question stays pending underneath");
    assert!(integration.state.shared().commitments().is_empty());
}

#[test]
fn test_residual_answer_then_downdate_pops_parent() {
    let domain = domain();
    let config = EngineConfig::default();
    let ctx = RuleContext::new(&domain, &config);

    let mut state = InformationState::new();
    state.push_qud(colour());
    let state = integrate(state, Some(DialogueMove::answer(Speaker::User, Answer::short("blue"))), &ctx).state;
    let state = integrate(state, Some(DialogueMove::answer(Speaker::User, Answer::short("dark blue"))), &ctx).state;

    // Residual resolved; the parent is now resolved by commitments too
    assert_eq!(state.shared().qud().peek(), Some(&colour()));
    let housekeeping = integrate(state, None, &ctx);
    assert_eq!(housekeeping.rule, Some(UpdateRuleId::DowndateQud));
    assert!(housekeeping.state.shared().qud().is_empty());
    assert!(housekeeping.state.shared().commitments().contains(&Proposition::new("colour", "dark blue")));
}

#[test]
fn test_request_materialises_plan_and_first_findout_is_pushed_on_selection() {
    let domain = domain();
    let config = EngineConfig::default();
    let ctx = RuleContext::new(&domain, &config);

    let integration = integrate(
        InformationState::new(),
        Some(DialogueMove::request(Speaker::User, "draft_nda")),
        &ctx,
    );
    assert_eq!(integration.rule, Some(UpdateRuleId::FindPlan));
    let plan = integration.state.private().active_plan().expect("plan should be materialised");
    assert_eq!(plan.task, "draft_nda");
    assert!(integration.state.shared().qud().is_empty(), "Nothing is pushed during integration");

    let selection = select::select(integration.state, &ctx);
    assert_eq!(selection.rule, Some(SelectionRuleId::SelectFromPlan));
    assert_eq!(selection.state.shared().qud().peek(), Some(&party()));
    let step = &selection.state.private().plan().unwrap().steps()[0];
    assert_eq!(step.status, StepStatus::InProgress);
}

#[test]
fn test_unintegrated_move_is_recorded_without_state_change() {
    let domain = domain();
    let config = EngineConfig::default();
    let ctx = RuleContext::new(&domain, &config);

    let mut state = InformationState::new();
    state.push_qud(colour());
    let before = state.clone();

    let mv = DialogueMove::request(Speaker::User, "fly_to_the_moon");
    let integration = integrate(state, Some(mv.clone()), &ctx);

    assert_eq!(integration.rule, None);
    assert_eq!(integration.bodies_invoked, 0);
    assert_eq!(integration.diagnostics, vec![Diagnostic::UnintegratedMove { tag: MoveTag::Request }]);

    let after = &integration.state;
    assert_eq!(after.shared().qud(), before.shared().qud());
    assert_eq!(after.shared().commitments(), before.shared().commitments());
    assert_eq!(after.private(), before.private());
    assert_eq!(after.control().last_confidence(), 0.0);
    assert!(after.control().pending().is_none());
    let last = after.shared().history().last().unwrap();
    assert_eq!(last.delta, StateDelta::MoveRecorded { mv, integrated: false });
}

#[test]
fn test_low_confidence_answer_is_not_integrated_and_triggers_clarification() {
    let domain = domain();
    let config = EngineConfig::default();
    let ctx = RuleContext::new(&domain, &config);

    let mut state = InformationState::new();
    state.push_qud(colour());
    let mv = DialogueMove::answer(Speaker::User, Answer::short("red")).with_confidence(0.3);

    let integration = integrate(state, Some(mv), &ctx);
    assert_eq!(integration.rule, None);
    assert!(integration.state.shared().commitments().is_empty());

    let selection = select::select(integration.state, &ctx);
    assert_eq!(selection.rule, Some(SelectionRuleId::SelectClarify));
    assert_eq!(selection.mv.unwrap().question(), Some(&colour()), "Clarify re-asks the QUD top");
    assert_eq!(selection.state.control().last_confidence(), 1.0);
}

#[test]
fn test_user_question_with_unresolved_dependency_builds_findout_plan() {
    let domain = domain();
    let config = EngineConfig::default();
    let ctx = RuleContext::new(&domain, &config);

    let integration = integrate(
        InformationState::new(),
        Some(DialogueMove::ask(Speaker::User, weather())),
        &ctx,
    );
    let plan = integration.state.private().active_plan().expect("dependency plan");
    assert_eq!(plan.task, "answer:weather");
    assert_eq!(plan.open_findouts().map(|(_, q)| q.clone()).collect::<Vec<_>>(), vec![city()]);
}

#[test]
fn test_answer_to_dependency_commits_without_popping_top() {
    let domain = domain();
    let config = EngineConfig::default();
    let ctx = RuleContext::new(&domain, &config);

    let mut state = InformationState::new();
    state.push_qud(city());
    state.push_qud(weather());
    let mv = DialogueMove::answer(Speaker::User, Answer::full("city", "Oslo"));

    // IntegrateAnswer (via depends) outranks local accommodation of the buried question
    assert_eq!(
        candidates(&state, Some(mv.clone()), &ctx),
        vec![UpdateRuleId::IntegrateAnswer, UpdateRuleId::LocalQuestionAccommodation]
    );
    let integration = integrate(state, Some(mv), &ctx);
    assert_eq!(integration.rule, Some(UpdateRuleId::IntegrateAnswer));
    assert_eq!(integration.state.shared().qud().peek(), Some(&weather()));
    assert!(integration.state.shared().commitments().contains(&Proposition::new("city", "Oslo")));
}

#[test]
fn test_local_question_accommodation_resolves_buried_question() {
    let domain = domain();
    let config = EngineConfig::default();
    let ctx = RuleContext::new(&domain, &config);

    let mut state = InformationState::new();
    state.push_qud(city());
    state.push_qud(colour());
    let mv = DialogueMove::answer(Speaker::User, Answer::full("city", "Paris"));

    let integration = integrate(state, Some(mv), &ctx);
    assert_eq!(integration.rule, Some(UpdateRuleId::LocalQuestionAccommodation));
    assert!(integration.state.shared().commitments().contains(&Proposition::new("city", "Paris")));
    assert_eq!(integration.state.shared().qud().peek(), Some(&colour()), "Top is untouched");

    // The buried copy is popped once it surfaces
    let mut state = integration.state;
    state.pop_qud();
    let housekeeping = integrate(state, None, &ctx);
    assert_eq!(housekeeping.rule, Some(UpdateRuleId::DowndateQud));
}

#[test]
fn test_issue_accommodation_answers_plan_findout_out_of_turn() {
    let domain = domain();
    let config = EngineConfig::default();
    let ctx = RuleContext::new(&domain, &config);

    let mut state = InformationState::new();
    state.set_plan(domain.plan_template("draft_nda").unwrap());
    state.push_qud(colour());
    let mv = DialogueMove::answer(Speaker::User, Answer::short("Acme"));

    assert_eq!(candidates(&state, Some(mv.clone()), &ctx), vec![UpdateRuleId::IssueAccommodation]);
    let integration = integrate(state, Some(mv), &ctx);
    assert!(integration.state.shared().commitments().contains(&Proposition::new("party", "Acme")));
    assert_eq!(integration.state.shared().qud().peek(), Some(&colour()));
    let plan = integration.state.private().plan().unwrap();
    assert_eq!(plan.steps()[0].status, StepStatus::Completed);
}

#[test]
fn test_dependent_issue_accommodation_starts_matching_task() {
    let domain = domain();
    let config = EngineConfig::default();
    let ctx = RuleContext::new(&domain, &config);

    let mv = DialogueMove::answer(Speaker::User, Answer::full("nda_type", "mutual"));
    let integration = integrate(InformationState::new(), Some(mv), &ctx);

    assert_eq!(integration.rule, Some(UpdateRuleId::DependentIssueAccommodation));
    let plan = integration.state.private().plan().expect("task plan accommodated");
    assert_eq!(plan.task, "draft_nda");
    assert_eq!(plan.steps()[1].status, StepStatus::Completed);
    assert!(integration.state.shared().commitments().contains(&Proposition::new("nda_type", "mutual")));
}

#[test]
fn test_greet_quit_and_icm_rules() {
    let domain = domain();
    let config = EngineConfig::default();
    let ctx = RuleContext::new(&domain, &config);

    let greeted = integrate(InformationState::new(), Some(DialogueMove::greet(Speaker::User)), &ctx);
    assert_eq!(greeted.rule, Some(UpdateRuleId::IntegrateGreet));
    assert_eq!(greeted.state.private().agenda().front(), Some(&DialogueMove::greet(Speaker::System)));

    let confused = integrate(
        InformationState::new(),
        Some(DialogueMove::icm(Speaker::User, Icm::NotUnderstood)),
        &ctx,
    );
    assert_eq!(confused.rule, Some(UpdateRuleId::IntegrateIcm));
    assert_eq!(confused.state.control().last_confidence(), 0.0);

    let quit = integrate(InformationState::new(), Some(DialogueMove::quit(Speaker::User)), &ctx);
    assert_eq!(quit.rule, Some(UpdateRuleId::IntegrateQuit));
    assert!(quit.state.control().is_terminated());
    assert_eq!(quit.state.private().agenda().front(), Some(&DialogueMove::quit(Speaker::System)));
}

#[test]
fn test_housekeeping_priority_and_move_preemption() {
    let domain = domain();
    let config = EngineConfig::default();
    let ctx = RuleContext::new(&domain, &config);

    let mut state = InformationState::new();
    state.set_plan(domain.plan_template("draft_nda").unwrap());
    state.push_qud(colour());
    state.add_commitment(Proposition::new("colour", "red"));

    assert_eq!(
        candidates(&state, None, &ctx),
        vec![UpdateRuleId::DowndateQud, UpdateRuleId::ExecFindout],
        "Downdate outranks ExecFindout"
    );
    assert_eq!(
        candidates(&state, Some(DialogueMove::greet(Speaker::User)), &ctx),
        vec![UpdateRuleId::IntegrateGreet],
        "A pending move disables housekeeping rules"
    );

    // ExecFindout pushes the next findout once the QUD is clear
    let state = integrate(state, None, &ctx).state;
    let exec = integrate(state, None, &ctx);
    assert_eq!(exec.rule, Some(UpdateRuleId::ExecFindout));
    assert_eq!(exec.state.shared().qud().peek(), Some(&party()));

    // ...and it is raised aloud by selection
    let selection = select::select(exec.state, &ctx);
    assert_eq!(selection.rule, Some(SelectionRuleId::SelectRaiseQuestion));
}

#[test]
fn test_exec_findout_skips_already_resolved_step() {
    let domain = domain();
    let config = EngineConfig::default();
    let ctx = RuleContext::new(&domain, &config);

    let mut state = InformationState::new();
    state.set_plan(domain.plan_template("draft_nda").unwrap());
    state.add_commitment(Proposition::new("party", "Acme"));

    let exec = integrate(state, None, &ctx);
    assert_eq!(exec.rule, Some(UpdateRuleId::ExecFindout));
    assert!(exec.state.shared().qud().is_empty());
    assert_eq!(exec.state.private().plan().unwrap().steps()[0].status, StepStatus::Completed);
}

#[test]
fn test_update_table_order_is_stable() {
    let ids: Vec<UpdateRuleId> = ibdm::kernel::update::UPDATE_RULES.iter().map(|r| r.id).collect();
    assert_eq!(
        ids,
        vec![
            UpdateRuleId::IntegrateAsk,
            UpdateRuleId::IntegrateAnswer,
            UpdateRuleId::IntegrateAssert,
            UpdateRuleId::IntegrateGreet,
            UpdateRuleId::IntegrateQuit,
            UpdateRuleId::IntegrateIcm,
            UpdateRuleId::FindPlan,
            UpdateRuleId::IssueAccommodation,
            UpdateRuleId::LocalQuestionAccommodation,
            UpdateRuleId::DependentIssueAccommodation,
            UpdateRuleId::DowndateQud,
            UpdateRuleId::ExecFindout,
        ]
    );
}

#[test]
fn test_user_question_with_registered_plan_loads_it() {
    let domain = domain().with_question_plan("colour", "draft_nda");
    let config = EngineConfig::default();
    let ctx = RuleContext::new(&domain, &config);

    let integration = integrate(
        InformationState::new(),
        Some(DialogueMove::ask(Speaker::User, colour())),
        &ctx,
    );
    assert_eq!(integration.rule, Some(UpdateRuleId::IntegrateAsk));
    let plan = integration.state.private().active_plan().expect("registered plan should load");
    assert_eq!(plan.task, "draft_nda");
    assert_eq!(integration.state.shared().qud().peek(), Some(&colour()));
}

fn assert_last_delta(state: &InformationState, version: u64, expected: StateDelta) {
    assert_eq!(state.version(), version, "{expected:?} must bump the version");
    assert_eq!(state.shared().history().len() as u64, version);
    let last = state.shared().history().last().unwrap();
    assert_eq!(last.version, version);
    assert_eq!(last.delta, expected);
}

#[test]
fn test_control_mutations_are_recorded_in_history() {
    let mut state = InformationState::new();
    let greet = DialogueMove::greet(Speaker::User);

    // 1. Each control write appends one entry and bumps the version
    state.set_pending(Some(greet.clone()));
    assert_last_delta(&state, 1, StateDelta::PendingSet { mv: Some(greet.clone()) });
    assert_eq!(state.take_pending(), Some(greet.clone()));
    assert_last_delta(&state, 2, StateDelta::PendingTaken { mv: greet });
    state.set_last_confidence(0.25);
    assert_last_delta(&state, 3, StateDelta::ConfidenceSet { confidence: 0.25 });
    state.set_awaiting_grounding(true);
    assert_last_delta(&state, 4, StateDelta::GroundingSet { awaiting: true });
    state.set_next_speaker(Speaker::User);
    assert_last_delta(&state, 5, StateDelta::FloorSet { speaker: Speaker::User });

    // 2. Writing the current value again changes nothing
    let version = state.version();
    state.set_last_confidence(0.25);
    state.set_awaiting_grounding(true);
    state.set_next_speaker(Speaker::User);
    state.set_pending(None);
    assert!(state.take_pending().is_none());
    assert_eq!(state.version(), version);
}

#[test]
fn test_unintegrated_move_leaves_confidence_drop_in_history() {
    let domain = domain();
    let config = EngineConfig::default();
    let ctx = RuleContext::new(&domain, &config);

    let mv = DialogueMove::request(Speaker::User, "fly_to_the_moon");
    let integration = integrate(InformationState::new(), Some(mv), &ctx);
    let deltas: Vec<&StateDelta> = integration.state.shared().history().iter().map(|e| &e.delta).collect();
    assert!(matches!(deltas[0], StateDelta::PendingSet { mv: Some(_) }));
    assert!(matches!(deltas[1], StateDelta::PendingTaken { .. }));
    assert_eq!(deltas[2], &StateDelta::ConfidenceSet { confidence: 0.0 });
    assert!(matches!(deltas[3], StateDelta::MoveRecorded { integrated: false, .. }));
}
