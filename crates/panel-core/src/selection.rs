//! Reviewer selection policies.
//!
//! Pure functions over a snapshot of the reviewer pool. Randomness comes from
//! the caller so selection is reproducible with a seeded generator.
//!
//! Both policies fill the three slots in order. A slot the policy cannot fill
//! is topped up with a uniform pick from whatever is left of the pool; a slot
//! stays empty only when the pool is exhausted.

use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::SliceRandom;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::UserSummary;
use crate::enums::{Capability, SelectionPolicy, Slot};
use crate::identity::has_capability;

/// Everything a policy needs to know about the item and the pool.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    pub author_id: &'a str,
    pub author_workplace: Option<&'a str>,
    pub author_department: Option<&'a str>,
    pub subject: Option<&'a str>,
    /// Directory entries holding `Expert`. Entries without it are ignored.
    pub pool: &'a [UserSummary],
    pub fallback_reviewer_id: Option<&'a str>,
    /// Case-insensitive substring of `position` identifying a department head.
    pub head_position_keyword: &'a str,
}

/// Why a reviewer landed in a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PickReason {
    Institution,
    DepartmentHead,
    Subject,
    Pool,
    Fallback,
    TopUp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SlotPick {
    pub slot: Slot,
    pub reviewer_id: String,
    pub reason: PickReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelSelection {
    pub picks: Vec<SlotPick>,
    /// Slots left empty because the pool ran out.
    pub missing: Vec<Slot>,
}

impl PanelSelection {
    #[must_use]
    pub fn reviewer_ids(&self) -> Vec<&str> {
        self.picks.iter().map(|p| p.reviewer_id.as_str()).collect()
    }
}

/// Pick up to three distinct reviewers for an item.
///
/// `exclude` holds reviewers that may not be picked (anyone who already
/// reviewed the item in an earlier round). The author is always excluded.
pub fn select_panel<R: Rng + ?Sized>(
    policy: SelectionPolicy,
    ctx: &SelectionContext<'_>,
    exclude: &BTreeSet<String>,
    rng: &mut R,
) -> PanelSelection {
    let candidates: Vec<&UserSummary> = ctx
        .pool
        .iter()
        .filter(|u| has_capability(*u, Capability::Expert))
        .filter(|u| u.id != ctx.author_id && !exclude.contains(&u.id))
        .collect();

    let mut picker = Picker {
        candidates,
        taken: BTreeSet::new(),
        selection: PanelSelection::default(),
    };

    match policy {
        SelectionPolicy::PoolA => pool_a(&mut picker, ctx, rng),
        SelectionPolicy::PoolB => pool_b(&mut picker, ctx, rng),
    }

    for slot in Slot::ALL {
        if !picker.has(slot) {
            let reviewer = picker.random(rng, |_| true);
            picker.place(slot, reviewer, PickReason::TopUp);
        }
    }

    let mut selection = picker.selection;
    selection.picks.sort_by_key(|p| p.slot);
    selection.missing = Slot::ALL
        .into_iter()
        .filter(|s| !selection.picks.iter().any(|p| p.slot == *s))
        .collect();
    selection
}

fn pool_a<R: Rng + ?Sized>(picker: &mut Picker<'_>, ctx: &SelectionContext<'_>, rng: &mut R) {
    let same_workplace = |u: &UserSummary| match (ctx.author_workplace, u.workplace.as_deref()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };

    let first = picker.random(rng, same_workplace);
    picker.place(Slot::First, first, PickReason::Institution);

    let keyword = ctx.head_position_keyword.to_lowercase();
    let head = ctx.author_department.and_then(|department| {
        picker.first_by_id(|u| {
            u.department.as_deref() == Some(department)
                && !keyword.is_empty()
                && u
                    .position
                    .as_deref()
                    .is_some_and(|p| p.to_lowercase().contains(&keyword))
        })
    });
    if head.is_some() {
        picker.place(Slot::Second, head, PickReason::DepartmentHead);
    } else {
        let second = picker.random(rng, same_workplace);
        picker.place(Slot::Second, second, PickReason::Institution);
    }

    let fallback = picker.fallback(ctx.fallback_reviewer_id);
    picker.place(Slot::Third, fallback, PickReason::Fallback);
}

fn pool_b<R: Rng + ?Sized>(picker: &mut Picker<'_>, ctx: &SelectionContext<'_>, rng: &mut R) {
    let first = picker.random(rng, |_| true);
    picker.place(Slot::First, first, PickReason::Pool);

    let by_subject = ctx
        .subject
        .and_then(|subject| picker.random(rng, |u| u.teaches(subject)));
    if by_subject.is_some() {
        picker.place(Slot::Second, by_subject, PickReason::Subject);
    } else {
        let second = picker.random(rng, |_| true);
        picker.place(Slot::Second, second, PickReason::Pool);
    }

    let fallback = picker.fallback(ctx.fallback_reviewer_id);
    picker.place(Slot::Third, fallback, PickReason::Fallback);
}

struct Picker<'a> {
    candidates: Vec<&'a UserSummary>,
    taken: BTreeSet<String>,
    selection: PanelSelection,
}

impl<'a> Picker<'a> {
    fn available(&self, filter: impl Fn(&UserSummary) -> bool) -> Vec<&'a UserSummary> {
        self.candidates
            .iter()
            .copied()
            .filter(|u| !self.taken.contains(&u.id) && filter(u))
            .collect()
    }

    fn random<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        filter: impl Fn(&UserSummary) -> bool,
    ) -> Option<&'a UserSummary> {
        self.available(filter).choose(rng).copied()
    }

    fn first_by_id(&self, filter: impl Fn(&UserSummary) -> bool) -> Option<&'a UserSummary> {
        self.available(filter).into_iter().min_by(|a, b| a.id.cmp(&b.id))
    }

    fn fallback(&self, id: Option<&str>) -> Option<&'a UserSummary> {
        let id = id.filter(|id| !id.is_empty())?;
        self.available(|u| u.id == id).into_iter().next()
    }

    fn has(&self, slot: Slot) -> bool {
        self.selection.picks.iter().any(|p| p.slot == slot)
    }

    fn place(&mut self, slot: Slot, reviewer: Option<&UserSummary>, reason: PickReason) {
        let Some(reviewer) = reviewer else { return };
        if self.has(slot) || !self.taken.insert(reviewer.id.clone()) {
            return;
        }
        self.selection.picks.push(SlotPick {
            slot,
            reviewer_id: reviewer.id.clone(),
            reason,
        });
    }
}
