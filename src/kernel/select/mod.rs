//! Selection rules: decide the system's next move.
//!
//! Same shape as the update table: [`SELECTION_RULES`] in priority order,
//! first match wins, at most one move per [`select`] call. A rule's effect
//! applies the system's own move to the state and returns it for generation.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use super::audit::Diagnostic;
use super::context::RuleContext;
use super::plan::{PlanAction, StepStatus};
use super::semantics::{Answer, DialogueMove, Icm, MoveKind, Speaker};
use super::state::InformationState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SelectionRuleId {
    SelectClarify,
    SelectAsk,
    SelectFromAgenda,
    SelectRaiseQuestion,
    SelectFromPlan,
    SelectAnswer,
    SelectGrounding,
}

impl fmt::Display for SelectionRuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub type Guard = fn(&InformationState, &RuleContext<'_>) -> bool;
pub type Effect = fn(InformationState, &RuleContext<'_>) -> (InformationState, Option<DialogueMove>);

#[derive(Clone, Copy)]
pub struct SelectionRule {
    pub id: SelectionRuleId,
    pub applies: Guard,
    pub apply: Effect,
}

impl fmt::Debug for SelectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionRule").field("id", &self.id).finish()
    }
}

pub static SELECTION_RULES: [SelectionRule; 7] = [
    SelectionRule { id: SelectionRuleId::SelectClarify, applies: clarify_applies, apply: clarify },
    SelectionRule { id: SelectionRuleId::SelectAsk, applies: ask_applies, apply: ask },
    SelectionRule { id: SelectionRuleId::SelectFromAgenda, applies: from_agenda_applies, apply: from_agenda },
    SelectionRule { id: SelectionRuleId::SelectRaiseQuestion, applies: raise_question_applies, apply: raise_question },
    SelectionRule { id: SelectionRuleId::SelectFromPlan, applies: from_plan_applies, apply: from_plan },
    SelectionRule { id: SelectionRuleId::SelectAnswer, applies: answer_applies, apply: answer },
    SelectionRule { id: SelectionRuleId::SelectGrounding, applies: grounding_applies, apply: grounding },
];

#[derive(Debug, Clone)]
pub struct Selection {
    pub state: InformationState,
    pub rule: Option<SelectionRuleId>,
    pub mv: Option<DialogueMove>,
    pub bodies_invoked: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// Pure function: state -> (state', move?).
///
/// The selected move is already recorded in the history. Asking or quitting
/// hands the floor to the user; exhaustion does too.
pub fn select(mut state: InformationState, ctx: &RuleContext<'_>) -> Selection {
    let mut rule = None;
    let mut mv = None;
    let mut bodies_invoked = 0;

    if let Some(r) = SELECTION_RULES.iter().find(|r| (r.applies)(&state, ctx)) {
        let (next, selected) = (r.apply)(state, ctx);
        state = next;
        rule = Some(r.id);
        mv = selected;
        bodies_invoked += 1;
        debug!(rule = %r.id, cycle = state.control().cycle(), "selection rule fired");
    }

    let mut diagnostics = Vec::new();
    match &mv {
        Some(m) => {
            let next = if m.yields_floor() { Speaker::User } else { Speaker::System };
            state.set_next_speaker(next);
        }
        None => {
            warn!(cycle = state.control().cycle(), "selection exhausted");
            diagnostics.push(Diagnostic::SelectionExhausted);
            state.set_next_speaker(Speaker::User);
        }
    }

    Selection { state, rule, mv, bodies_invoked, diagnostics }
}

pub fn candidates(state: &InformationState, ctx: &RuleContext<'_>) -> Vec<SelectionRuleId> {
    SELECTION_RULES
        .iter()
        .filter(|r| (r.applies)(state, ctx))
        .map(|r| r.id)
        .collect()
}

/// Record an own move as uttered. Any system move grounds the user's last one.
fn emit(state: &mut InformationState, mv: DialogueMove) -> Option<DialogueMove> {
    state.record_move(mv.clone(), true);
    state.set_awaiting_grounding(false);
    Some(mv)
}

fn clarify_applies(state: &InformationState, ctx: &RuleContext<'_>) -> bool {
    state.control().last_confidence() < ctx.config.clarification_threshold
}

/// Re-ask the QUD top, unless the user raised it: asking it back would
/// take the question over from them.
fn clarify(mut state: InformationState, _ctx: &RuleContext<'_>) -> (InformationState, Option<DialogueMove>) {
    state.set_last_confidence(1.0);
    let mv = match state.shared().qud().peek() {
        Some(top) if state.last_asker(top) != Some(Speaker::User) => {
            DialogueMove::ask(Speaker::System, top.clone())
        }
        _ => DialogueMove::icm(Speaker::System, Icm::NotUnderstood),
    };
    let mv = emit(&mut state, mv);
    (state, mv)
}

fn ask_applies(state: &InformationState, _ctx: &RuleContext<'_>) -> bool {
    matches!(state.private().agenda().front().map(|m| &m.kind), Some(MoveKind::Ask(_)))
}

fn ask(mut state: InformationState, _ctx: &RuleContext<'_>) -> (InformationState, Option<DialogueMove>) {
    let Some(mv) = state.dequeue_move() else { return (state, None) };
    if let Some(question) = mv.question() {
        state.push_qud(question.clone());
    }
    let mv = emit(&mut state, mv);
    (state, mv)
}

fn from_agenda_applies(state: &InformationState, _ctx: &RuleContext<'_>) -> bool {
    state
        .private()
        .agenda()
        .front()
        .is_some_and(|m| !matches!(m.kind, MoveKind::Ask(_)))
}

fn from_agenda(mut state: InformationState, _ctx: &RuleContext<'_>) -> (InformationState, Option<DialogueMove>) {
    let Some(mv) = state.dequeue_move() else { return (state, None) };
    if let MoveKind::Assert(p) = &mv.kind {
        state.add_commitment(p.clone());
    }
    let mv = emit(&mut state, mv);
    (state, mv)
}

/// Top of the QUD was never uttered and is still open.
fn raise_question_applies(state: &InformationState, ctx: &RuleContext<'_>) -> bool {
    state
        .shared()
        .qud()
        .peek()
        .is_some_and(|top| !state.was_asked(top) && !ctx.resolved_by(top, state))
}

fn raise_question(mut state: InformationState, _ctx: &RuleContext<'_>) -> (InformationState, Option<DialogueMove>) {
    let Some(top) = state.shared().qud().peek().cloned() else { return (state, None) };
    let raise_step = state
        .private()
        .plan()
        .and_then(|p| p.step_for_question(&top))
        .filter(|s| matches!(s.action, PlanAction::Raise(_)))
        .map(|s| s.id.clone());
    if let Some(step) = raise_step {
        state.mark_subplan_complete(&step);
    }
    let mv = emit(&mut state, DialogueMove::ask(Speaker::System, top));
    (state, mv)
}

fn from_plan_applies(state: &InformationState, ctx: &RuleContext<'_>) -> bool {
    if !state.private().agenda().is_empty() {
        return false;
    }
    let qud = state.shared().qud();
    let Some(plan) = state.private().active_plan() else { return false };
    if plan.has_open_step(qud) {
        return false;
    }
    plan.next_step(qud).is_some_and(|s| match &s.action {
        PlanAction::Findout(q) | PlanAction::Raise(q) => !ctx.resolved_by(q, state),
        PlanAction::Inform(_) => true,
    })
}

fn from_plan(mut state: InformationState, _ctx: &RuleContext<'_>) -> (InformationState, Option<DialogueMove>) {
    let next = state
        .private()
        .active_plan()
        .and_then(|p| p.next_step(state.shared().qud()))
        .map(|s| (s.id.clone(), s.action.clone(), s.status));
    let Some((step, action, status)) = next else { return (state, None) };

    let mv = match action {
        PlanAction::Findout(q) => {
            state.push_qud(q.clone());
            if status == StepStatus::Pending {
                state.mark_subplan_in_progress(&step);
            }
            DialogueMove::ask(Speaker::System, q)
        }
        PlanAction::Raise(q) => {
            state.push_qud(q.clone());
            state.mark_subplan_complete(&step);
            DialogueMove::ask(Speaker::System, q)
        }
        PlanAction::Inform(p) => {
            state.add_commitment(p.clone());
            state.mark_subplan_complete(&step);
            DialogueMove::assert(Speaker::System, p)
        }
    };
    let mv = emit(&mut state, mv);
    (state, mv)
}

fn answer_applies(state: &InformationState, ctx: &RuleContext<'_>) -> bool {
    let Some(top) = state.shared().qud().peek() else { return false };
    state.last_asker(top) == Some(Speaker::User)
        && ctx.unresolved_dependencies(top, state).is_empty()
        && ctx
            .domain
            .answer_from_beliefs(top, state.private().beliefs(), state.shared().commitments())
            .is_some()
}

fn answer(mut state: InformationState, ctx: &RuleContext<'_>) -> (InformationState, Option<DialogueMove>) {
    let Some(top) = state.shared().qud().peek().cloned() else { return (state, None) };
    let Some(p) = ctx.domain.answer_from_beliefs(
        &top,
        state.private().beliefs(),
        state.shared().commitments(),
    ) else {
        return (state, None);
    };
    state.pop_qud();
    state.add_commitment(p.clone());
    state.complete_step_for(&top);
    let reply = DialogueMove::answer(Speaker::System, Answer::from(p).addressing(top.key()));
    let mv = emit(&mut state, reply);
    (state, mv)
}

fn grounding_applies(state: &InformationState, _ctx: &RuleContext<'_>) -> bool {
    state.control().awaiting_grounding()
}

fn grounding(mut state: InformationState, _ctx: &RuleContext<'_>) -> (InformationState, Option<DialogueMove>) {
    let mv = emit(&mut state, DialogueMove::icm(Speaker::System, Icm::Acknowledge));
    (state, mv)
}
