//! Update rules: fold one incoming move (or none) into the information state.
//!
//! Rules live in [`UPDATE_RULES`], an ordered table. The first rule whose
//! guard holds fires; at most one rule body runs per [`integrate`] call.
//! Rules that consume a move take it off the pending marker; a move nobody
//! consumes is recorded as unintegrated.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use super::audit::Diagnostic;
use super::context::RuleContext;
use super::plan::{Plan, PlanAction};
use super::semantics::{Answer, DialogueMove, Icm, MoveKind, Question, Speaker};
use super::state::InformationState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UpdateRuleId {
    IntegrateAsk,
    IntegrateAnswer,
    IntegrateAssert,
    IntegrateGreet,
    IntegrateQuit,
    IntegrateIcm,
    FindPlan,
    IssueAccommodation,
    LocalQuestionAccommodation,
    DependentIssueAccommodation,
    DowndateQud,
    ExecFindout,
}

impl fmt::Display for UpdateRuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub type Guard = fn(&InformationState, &RuleContext<'_>) -> bool;
pub type Effect = fn(InformationState, &RuleContext<'_>) -> InformationState;

#[derive(Clone, Copy)]
pub struct UpdateRule {
    pub id: UpdateRuleId,
    pub applies: Guard,
    pub apply: Effect,
}

impl fmt::Debug for UpdateRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateRule").field("id", &self.id).finish()
    }
}

/// Priority order. Earlier entries win.
pub static UPDATE_RULES: [UpdateRule; 12] = [
    UpdateRule { id: UpdateRuleId::IntegrateAsk, applies: integrate_ask_applies, apply: integrate_ask },
    UpdateRule { id: UpdateRuleId::IntegrateAnswer, applies: integrate_answer_applies, apply: integrate_answer },
    UpdateRule { id: UpdateRuleId::IntegrateAssert, applies: integrate_assert_applies, apply: integrate_assert },
    UpdateRule { id: UpdateRuleId::IntegrateGreet, applies: integrate_greet_applies, apply: integrate_greet },
    UpdateRule { id: UpdateRuleId::IntegrateQuit, applies: integrate_quit_applies, apply: integrate_quit },
    UpdateRule { id: UpdateRuleId::IntegrateIcm, applies: integrate_icm_applies, apply: integrate_icm },
    UpdateRule { id: UpdateRuleId::FindPlan, applies: find_plan_applies, apply: find_plan },
    UpdateRule { id: UpdateRuleId::IssueAccommodation, applies: issue_accommodation_applies, apply: issue_accommodation },
    UpdateRule { id: UpdateRuleId::LocalQuestionAccommodation, applies: local_accommodation_applies, apply: local_accommodation },
    UpdateRule { id: UpdateRuleId::DependentIssueAccommodation, applies: dependent_accommodation_applies, apply: dependent_accommodation },
    UpdateRule { id: UpdateRuleId::DowndateQud, applies: downdate_qud_applies, apply: downdate_qud },
    UpdateRule { id: UpdateRuleId::ExecFindout, applies: exec_findout_applies, apply: exec_findout },
];

#[derive(Debug, Clone)]
pub struct Integration {
    pub state: InformationState,
    pub rule: Option<UpdateRuleId>,
    /// Rule bodies run during this call. Never more than one.
    pub bodies_invoked: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// Pure function: (state, move) -> state'.
///
/// Sets the pending marker, runs the first applicable rule, then records any
/// move left pending as unintegrated.
pub fn integrate(
    mut state: InformationState,
    mv: Option<DialogueMove>,
    ctx: &RuleContext<'_>,
) -> Integration {
    state.set_pending(mv);

    let mut rule = None;
    let mut bodies_invoked = 0;
    if let Some(r) = UPDATE_RULES.iter().find(|r| (r.applies)(&state, ctx)) {
        state = (r.apply)(state, ctx);
        rule = Some(r.id);
        bodies_invoked += 1;
        debug!(rule = %r.id, cycle = state.control().cycle(), "update rule fired");
    }

    let mut diagnostics = Vec::new();
    if let Some(leftover) = state.take_pending() {
        warn!(tag = ?leftover.tag(), cycle = state.control().cycle(), "move not integrated");
        diagnostics.push(Diagnostic::UnintegratedMove { tag: leftover.tag() });
        state.set_last_confidence(0.0);
        state.record_move(leftover, false);
    }

    Integration { state, rule, bodies_invoked, diagnostics }
}

/// Every rule whose guard holds for (state, move), in priority order.
/// `integrate` fires the first of these.
pub fn candidates(
    state: &InformationState,
    mv: Option<DialogueMove>,
    ctx: &RuleContext<'_>,
) -> Vec<UpdateRuleId> {
    let mut scratch = state.clone();
    scratch.set_pending(mv);
    UPDATE_RULES
        .iter()
        .filter(|r| (r.applies)(&scratch, ctx))
        .map(|r| r.id)
        .collect()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn pending(state: &InformationState) -> Option<&DialogueMove> {
    state.control().pending()
}

/// Take the pending move and record it as integrated.
fn consume(state: &mut InformationState) -> Option<DialogueMove> {
    let mv = state.take_pending()?;
    state.set_last_confidence(mv.confidence);
    state.record_move(mv.clone(), true);
    Some(mv)
}

/// Answer content of the pending move, if it is confident enough to integrate.
fn pending_answer(state: &InformationState, ctx: &RuleContext<'_>) -> Option<Answer> {
    let mv = pending(state)?;
    if mv.confidence < ctx.config.clarification_threshold {
        return None;
    }
    mv.answer_content()
}

fn mark_grounding(state: &mut InformationState, speaker: Speaker) {
    if speaker == Speaker::User {
        state.set_awaiting_grounding(true);
    }
}

/// Commit the binding of `answer` for `question`, completing its plan step.
fn commit_binding(
    state: &mut InformationState,
    ctx: &RuleContext<'_>,
    question: &Question,
    answer: &Answer,
) -> bool {
    match ctx.binding(question, answer) {
        Some(p) => {
            state.add_commitment(p);
            state.complete_step_for(question);
            true
        }
        None => false,
    }
}

/// Push `question`, then resolve or narrow it with `answer`.
fn accommodate(
    state: &mut InformationState,
    ctx: &RuleContext<'_>,
    question: Question,
    answer: &Answer,
) {
    state.push_qud(question.clone());
    if ctx.binding(&question, answer).is_some() {
        state.pop_qud();
        commit_binding(state, ctx, &question, answer);
    } else if let Some(residual) = ctx.domain.combines(&question, answer) {
        if let Some(step) = state
            .private()
            .plan()
            .and_then(|p| p.step_for_question(&question))
            .map(|s| s.id.clone())
        {
            state.mark_subplan_in_progress(&step);
        }
        state.push_qud(residual);
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// An unsure ask is left for clarification, like an unsure answer.
fn integrate_ask_applies(state: &InformationState, ctx: &RuleContext<'_>) -> bool {
    pending(state).is_some_and(|m| {
        matches!(m.kind, MoveKind::Ask(_)) && m.confidence >= ctx.config.clarification_threshold
    })
}

fn integrate_ask(mut state: InformationState, ctx: &RuleContext<'_>) -> InformationState {
    let Some(mv) = consume(&mut state) else { return state };
    let Some(question) = mv.question().cloned() else { return state };
    state.push_qud(question.clone());

    if mv.speaker == Speaker::User && state.private().active_plan().is_none() {
        let plan = ctx.domain.plan_for_question(&question).or_else(|| {
            let deps = ctx.unresolved_dependencies(&question, &state);
            (!deps.is_empty()).then(|| {
                Plan::new(
                    format!("answer:{}", question.topic()),
                    deps.into_iter().map(PlanAction::Findout),
                )
            })
        });
        if let Some(plan) = plan {
            state.set_plan(plan);
        }
    }
    state
}

fn integrate_answer_applies(state: &InformationState, ctx: &RuleContext<'_>) -> bool {
    let (Some(answer), Some(top)) = (pending_answer(state, ctx), state.shared().qud().peek()) else {
        return false;
    };
    ctx.integrable(&answer, top)
        || ctx.reachable(top).iter().any(|q| ctx.binding(q, &answer).is_some())
}

fn integrate_answer(mut state: InformationState, ctx: &RuleContext<'_>) -> InformationState {
    let Some(mv) = consume(&mut state) else { return state };
    let Some(answer) = mv.answer_content() else { return state };
    let Some(top) = state.shared().qud().peek().cloned() else { return state };

    if ctx.binding(&top, &answer).is_some() {
        state.pop_qud();
        commit_binding(&mut state, ctx, &top, &answer);
    } else if let Some(residual) = ctx.domain.combines(&top, &answer) {
        state.push_qud(residual);
    } else if let Some(dep) = ctx
        .reachable(&top)
        .into_iter()
        .find(|q| ctx.binding(q, &answer).is_some())
    {
        commit_binding(&mut state, ctx, &dep, &answer);
    }
    mark_grounding(&mut state, mv.speaker);
    state
}

fn integrate_assert_applies(state: &InformationState, _ctx: &RuleContext<'_>) -> bool {
    matches!(pending(state).map(|m| &m.kind), Some(MoveKind::Assert(_)))
}

fn integrate_assert(mut state: InformationState, _ctx: &RuleContext<'_>) -> InformationState {
    let Some(mv) = consume(&mut state) else { return state };
    if let MoveKind::Assert(p) = mv.kind {
        state.add_commitment(p);
    }
    mark_grounding(&mut state, mv.speaker);
    state
}

fn integrate_greet_applies(state: &InformationState, _ctx: &RuleContext<'_>) -> bool {
    pending(state).is_some_and(|m| m.speaker == Speaker::User && m.kind == MoveKind::Greet)
}

fn integrate_greet(mut state: InformationState, _ctx: &RuleContext<'_>) -> InformationState {
    if consume(&mut state).is_some() {
        state.enqueue_move(DialogueMove::greet(Speaker::System));
    }
    state
}

fn integrate_quit_applies(state: &InformationState, _ctx: &RuleContext<'_>) -> bool {
    pending(state).is_some_and(|m| m.kind == MoveKind::Quit)
}

fn integrate_quit(mut state: InformationState, _ctx: &RuleContext<'_>) -> InformationState {
    let Some(mv) = consume(&mut state) else { return state };
    if mv.speaker == Speaker::User {
        state.enqueue_move(DialogueMove::quit(Speaker::System));
    }
    state.terminate();
    state
}

fn integrate_icm_applies(state: &InformationState, _ctx: &RuleContext<'_>) -> bool {
    pending(state)
        .is_some_and(|m| m.speaker == Speaker::User && matches!(m.kind, MoveKind::Icm(_)))
}

fn integrate_icm(mut state: InformationState, _ctx: &RuleContext<'_>) -> InformationState {
    let Some(mv) = consume(&mut state) else { return state };
    if mv.kind == MoveKind::Icm(Icm::NotUnderstood) {
        state.set_last_confidence(0.0);
    }
    state
}

fn find_plan_applies(state: &InformationState, ctx: &RuleContext<'_>) -> bool {
    let Some(MoveKind::Request { task }) = pending(state).map(|m| &m.kind) else {
        return false;
    };
    state.private().active_plan().is_none()
        && ctx.domain.is_accommodable(task)
        && ctx.domain.plan_template(task).is_some()
}

fn find_plan(mut state: InformationState, ctx: &RuleContext<'_>) -> InformationState {
    let Some(mv) = consume(&mut state) else { return state };
    if let MoveKind::Request { task } = &mv.kind {
        if let Some(plan) = ctx.domain.plan_template(task) {
            state.set_plan(plan);
        }
    }
    state
}

/// First open findout of the active plan, not yet under discussion, that the answer fits.
fn accommodatable_issue(state: &InformationState, ctx: &RuleContext<'_>) -> Option<Question> {
    let answer = pending_answer(state, ctx)?;
    if let Some(top) = state.shared().qud().peek() {
        if ctx.integrable(&answer, top) {
            return None;
        }
    }
    let plan = state.private().active_plan()?;
    plan.open_findouts()
        .map(|(_, q)| q)
        .find(|q| !state.shared().qud().contains(q) && ctx.integrable(&answer, q))
        .cloned()
}

fn issue_accommodation_applies(state: &InformationState, ctx: &RuleContext<'_>) -> bool {
    accommodatable_issue(state, ctx).is_some()
}

fn issue_accommodation(mut state: InformationState, ctx: &RuleContext<'_>) -> InformationState {
    let Some(question) = accommodatable_issue(&state, ctx) else { return state };
    let Some(mv) = consume(&mut state) else { return state };
    let Some(answer) = mv.answer_content() else { return state };
    accommodate(&mut state, ctx, question, &answer);
    mark_grounding(&mut state, mv.speaker);
    state
}

/// A question below the QUD top that the pending answer resolves.
fn buried_question(state: &InformationState, ctx: &RuleContext<'_>) -> Option<Question> {
    let answer = pending_answer(state, ctx)?;
    state
        .shared()
        .qud()
        .iter()
        .skip(1)
        .find(|q| ctx.binding(q, &answer).is_some())
        .cloned()
}

fn local_accommodation_applies(state: &InformationState, ctx: &RuleContext<'_>) -> bool {
    buried_question(state, ctx).is_some()
}

fn local_accommodation(mut state: InformationState, ctx: &RuleContext<'_>) -> InformationState {
    let Some(question) = buried_question(&state, ctx) else { return state };
    let Some(mv) = consume(&mut state) else { return state };
    let Some(answer) = mv.answer_content() else { return state };
    accommodate(&mut state, ctx, question, &answer);
    mark_grounding(&mut state, mv.speaker);
    state
}

/// A registered task whose plan has a findout the pending answer resolves.
fn dependent_issue(state: &InformationState, ctx: &RuleContext<'_>) -> Option<(Plan, Question)> {
    if state.private().active_plan().is_some() {
        return None;
    }
    let answer = pending_answer(state, ctx)?;
    ctx.domain
        .tasks()
        .into_iter()
        .filter(|task| ctx.domain.is_accommodable(task))
        .filter_map(|task| ctx.domain.plan_template(task))
        .find_map(|plan| {
            let question = plan
                .open_findouts()
                .map(|(_, q)| q)
                .find(|q| ctx.binding(q, &answer).is_some())
                .cloned()?;
            Some((plan, question))
        })
}

fn dependent_accommodation_applies(state: &InformationState, ctx: &RuleContext<'_>) -> bool {
    dependent_issue(state, ctx).is_some()
}

fn dependent_accommodation(mut state: InformationState, ctx: &RuleContext<'_>) -> InformationState {
    let Some((plan, question)) = dependent_issue(&state, ctx) else { return state };
    let Some(mv) = consume(&mut state) else { return state };
    let Some(answer) = mv.answer_content() else { return state };
    state.set_plan(plan);
    accommodate(&mut state, ctx, question, &answer);
    mark_grounding(&mut state, mv.speaker);
    state
}

fn downdate_qud_applies(state: &InformationState, ctx: &RuleContext<'_>) -> bool {
    pending(state).is_none()
        && state
            .shared()
            .qud()
            .peek()
            .is_some_and(|top| ctx.resolved_by(top, state))
}

fn downdate_qud(mut state: InformationState, _ctx: &RuleContext<'_>) -> InformationState {
    if let Some(question) = state.pop_qud() {
        state.complete_step_for(&question);
    }
    state
}

fn exec_findout_applies(state: &InformationState, _ctx: &RuleContext<'_>) -> bool {
    if pending(state).is_some() || !state.private().agenda().is_empty() {
        return false;
    }
    let qud = state.shared().qud();
    state.private().active_plan().is_some_and(|plan| {
        !plan.has_open_step(qud)
            && plan
                .next_step(qud)
                .is_some_and(|s| !matches!(s.action, PlanAction::Inform(_)))
    })
}

fn exec_findout(mut state: InformationState, ctx: &RuleContext<'_>) -> InformationState {
    let next = state
        .private()
        .active_plan()
        .and_then(|p| p.next_step(state.shared().qud()))
        .and_then(|s| s.action.question().map(|q| (s.id.clone(), q.clone())));
    let Some((step, question)) = next else { return state };

    if ctx.resolved_by(&question, &state) {
        state.mark_subplan_complete(&step);
    } else {
        state.push_qud(question);
        state.mark_subplan_in_progress(&step);
    }
    state
}
