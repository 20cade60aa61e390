//! Workflow state machine.
//!
//! `reduce` is pure: it takes the current state and an event and returns the
//! next state plus the fetches that state needs. Fetch results come back as
//! [`Completion`]s and are applied with [`Workflow::apply`], which drops any
//! result whose token no longer matches the slot it was issued for.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{EntryScope, WorkflowConfig};
use crate::error::FlowError;
use crate::form::FormSpec;
use crate::model::{Center, EffectiveEntry, Entry, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Menu,
    Enter,
    View,
    Edit,
}

impl Mode {
    pub fn parse(raw: &str) -> Option<Mode> {
        match raw {
            "menu" => Some(Mode::Menu),
            "enter" => Some(Mode::Enter),
            "view" => Some(Mode::View),
            "edit" => Some(Mode::Edit),
            _ => None,
        }
    }
}

/// The screen the user is on, derived from mode and selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Step {
    Login,
    Menu,
    #[serde(rename = "Enter.SelectCenter")]
    EnterSelectCenter,
    #[serde(rename = "Enter.SelectStudent")]
    EnterSelectStudent,
    #[serde(rename = "Enter.Form")]
    EnterForm,
    #[serde(rename = "View.SelectCenter")]
    ViewSelectCenter,
    #[serde(rename = "View.List")]
    ViewList,
    #[serde(rename = "Edit.SelectCenter")]
    EditSelectCenter,
    #[serde(rename = "Edit.List")]
    EditList,
    #[serde(rename = "Edit.Form")]
    EditForm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowOptions {
    pub sessions: bool,
    pub center_from_session: bool,
    pub entries_scope: EntryScope,
}

impl From<&WorkflowConfig> for WorkflowOptions {
    fn from(c: &WorkflowConfig) -> Self {
        Self {
            sessions: c.sessions,
            center_from_session: c.center_from_session,
            entries_scope: c.entries_scope,
        }
    }
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self::from(&WorkflowConfig::default())
    }
}

/// Fetched data plus the token of the request that may still fill it.
#[derive(Debug, Clone, Default, PartialEq)]
struct Slot<T> {
    value: T,
    pending: Option<u64>,
}

impl<T: Default> Slot<T> {
    fn clear(&mut self) {
        self.value = T::default();
        self.pending = None;
    }

    fn fill(&mut self, token: u64, value: T) -> bool {
        if self.pending != Some(token) {
            return false;
        }
        self.value = value;
        self.pending = None;
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub original: Entry,
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub enum Event {
    LoggedIn(Session),
    LoggedOut,
    Choose(Mode),
    /// An empty name clears the selection.
    SelectCenter(String),
    /// An empty name clears the selection.
    SelectStudent(String),
    SetField { name: String, value: String },
    StartEdit { uid: String },
    SetEditField { name: String, value: String },
    CancelEdit,
    /// A new entry was stored.
    Submitted,
    /// The edit draft was written (or torn); leave the form and relist.
    EditFinished,
    BackToMenu,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    LoadCenters { token: u64 },
    LoadStudents { token: u64, center: String },
    LoadMaster { token: u64, center: String, student: String },
    Reconcile { token: u64, center: String, owner: Option<String> },
}

#[derive(Debug, Clone)]
pub enum Completion {
    Centers { token: u64, centers: Vec<Center> },
    Students { token: u64, students: Vec<String> },
    Master { token: u64, attributes: BTreeMap<String, String> },
    Entries { token: u64, entries: Vec<EffectiveEntry> },
}

#[derive(Debug, Clone)]
pub struct Workflow {
    options: WorkflowOptions,
    form_spec: FormSpec,
    mode: Mode,
    session: Option<Session>,
    selected_center: String,
    selected_student: String,
    centers: Slot<Vec<Center>>,
    students: Slot<Vec<String>>,
    master: Slot<BTreeMap<String, String>>,
    entries: Slot<Vec<EffectiveEntry>>,
    form: BTreeMap<String, String>,
    editing: Option<EditDraft>,
    generation: u64,
}

impl Workflow {
    pub fn new(options: WorkflowOptions, form_spec: FormSpec) -> Self {
        let form = form_spec.blank();
        Self {
            options,
            form_spec,
            mode: Mode::Menu,
            session: None,
            selected_center: String::new(),
            selected_student: String::new(),
            centers: Slot::default(),
            students: Slot::default(),
            master: Slot::default(),
            entries: Slot::default(),
            form,
            editing: None,
            generation: 0,
        }
    }

    pub fn step(&self) -> Step {
        if self.options.sessions && self.session.is_none() {
            return Step::Login;
        }
        let has_center = !self.selected_center.is_empty();
        match self.mode {
            Mode::Menu => Step::Menu,
            Mode::Enter if !has_center => Step::EnterSelectCenter,
            Mode::Enter if self.selected_student.is_empty() => Step::EnterSelectStudent,
            Mode::Enter => Step::EnterForm,
            Mode::View if !has_center => Step::ViewSelectCenter,
            Mode::View => Step::ViewList,
            Mode::Edit if !has_center => Step::EditSelectCenter,
            Mode::Edit if self.editing.is_some() => Step::EditForm,
            Mode::Edit => Step::EditList,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn form_spec(&self) -> &FormSpec {
        &self.form_spec
    }

    pub fn selected_center(&self) -> &str {
        &self.selected_center
    }

    pub fn selected_student(&self) -> &str {
        &self.selected_student
    }

    pub fn centers(&self) -> &[Center] {
        &self.centers.value
    }

    pub fn students(&self) -> &[String] {
        &self.students.value
    }

    pub fn master_attributes(&self) -> &BTreeMap<String, String> {
        &self.master.value
    }

    pub fn entries(&self) -> &[EffectiveEntry] {
        &self.entries.value
    }

    pub fn form(&self) -> &BTreeMap<String, String> {
        &self.form
    }

    pub fn editing(&self) -> Option<&EditDraft> {
        self.editing.as_ref()
    }

    /// Username entries are written under ("" without sessions).
    pub fn author(&self) -> String {
        self.session
            .as_ref()
            .map(|s| s.username.clone())
            .unwrap_or_default()
    }

    fn owner_filter(&self) -> Option<String> {
        match self.options.entries_scope {
            EntryScope::Center => None,
            EntryScope::Owner => self.session.as_ref().map(|s| s.username.clone()),
        }
    }

    fn next_token(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn load_centers(&mut self) -> Effect {
        let token = self.next_token();
        self.centers.pending = Some(token);
        Effect::LoadCenters { token }
    }

    fn load_students(&mut self) -> Effect {
        let token = self.next_token();
        self.students.pending = Some(token);
        Effect::LoadStudents {
            token,
            center: self.selected_center.clone(),
        }
    }

    fn load_master(&mut self) -> Effect {
        let token = self.next_token();
        self.master.pending = Some(token);
        Effect::LoadMaster {
            token,
            center: self.selected_center.clone(),
            student: self.selected_student.clone(),
        }
    }

    fn load_entries(&mut self) -> Effect {
        let token = self.next_token();
        self.entries.pending = Some(token);
        Effect::Reconcile {
            token,
            center: self.selected_center.clone(),
            owner: self.owner_filter(),
        }
    }

    /// Drop the student selection and everything fetched for it.
    fn clear_student(&mut self) {
        self.selected_student.clear();
        self.master.clear();
        self.form = self.form_spec.blank();
    }

    /// Drop the center selection and everything that depends on it.
    fn clear_center(&mut self) {
        self.selected_center.clear();
        self.students.clear();
        self.entries.clear();
        self.editing = None;
        self.clear_student();
    }

    fn reset_to_menu(&mut self) {
        self.mode = Mode::Menu;
        self.clear_center();
    }

    /// Fixed center from the session, when configured that way.
    fn session_center(&self) -> Option<String> {
        if !self.options.center_from_session {
            return None;
        }
        self.session.as_ref().map(|s| s.center_id.clone())
    }

    /// Fetches the current step needs.
    fn stage_effects(&mut self) -> Vec<Effect> {
        match self.step() {
            Step::Login | Step::Menu => Vec::new(),
            Step::EnterSelectCenter | Step::ViewSelectCenter | Step::EditSelectCenter => {
                vec![self.load_centers()]
            }
            Step::EnterSelectStudent => vec![self.load_students()],
            Step::EnterForm => vec![self.load_master()],
            Step::ViewList | Step::EditList | Step::EditForm => vec![self.load_entries()],
        }
    }

    fn require(&self, ok: bool, what: &str) -> Result<(), FlowError> {
        if ok {
            Ok(())
        } else {
            Err(FlowError::NotReady(format!(
                "{what} is not available at step {:?}",
                self.step()
            )))
        }
    }

    /// Store a fetch result if it still answers the latest request for its slot.
    pub fn apply(&mut self, completion: Completion) -> bool {
        let (slot, token, applied) = match completion {
            Completion::Centers { token, centers } => {
                ("centers", token, self.centers.fill(token, centers))
            }
            Completion::Students { token, students } => {
                ("students", token, self.students.fill(token, students))
            }
            Completion::Master { token, attributes } => {
                ("master", token, self.master.fill(token, attributes))
            }
            Completion::Entries { token, entries } => {
                ("entries", token, self.entries.fill(token, entries))
            }
        };
        if !applied {
            debug!(slot, token, "dropping stale fetch result");
        }
        applied
    }
}

/// One transition. Returns the next state and the fetches to run, or an error
/// when `event` is not valid at the current step (the state is unchanged).
pub fn reduce(state: &Workflow, event: Event) -> Result<(Workflow, Vec<Effect>), FlowError> {
    let mut next = state.clone();
    let step = state.step();
    let logged_out = step == Step::Login;

    let effects = match event {
        Event::LoggedIn(session) => {
            next.session = Some(session);
            next.reset_to_menu();
            Vec::new()
        }
        Event::LoggedOut => {
            next.session = None;
            next.reset_to_menu();
            next.centers.clear();
            Vec::new()
        }
        Event::Choose(mode) => {
            next.require(!logged_out, "the menu")?;
            next.reset_to_menu();
            next.mode = mode;
            if mode != Mode::Menu {
                if let Some(center) = next.session_center() {
                    next.selected_center = center;
                }
            }
            next.stage_effects()
        }
        Event::SelectCenter(center) => {
            next.require(
                !logged_out && state.mode != Mode::Menu,
                "center selection",
            )?;
            if state.options.center_from_session {
                return Err(FlowError::NotReady(
                    "the center is fixed by the session".to_string(),
                ));
            }
            next.clear_center();
            next.selected_center = center;
            next.stage_effects()
        }
        Event::SelectStudent(student) => {
            next.require(
                matches!(step, Step::EnterSelectStudent | Step::EnterForm),
                "student selection",
            )?;
            next.clear_student();
            next.selected_student = student;
            next.stage_effects()
        }
        Event::SetField { name, value } => {
            next.require(step == Step::EnterForm, "form input")?;
            let spec = next.form_spec.clone();
            spec.set(&mut next.form, &name, value)?;
            Vec::new()
        }
        Event::StartEdit { uid } => {
            next.require(step == Step::EditList, "editing")?;
            let Some(current) = state.entries.value.iter().find(|e| e.entry.uid == uid) else {
                return Err(FlowError::NotReady(format!(
                    "entry {uid} is not in the current listing"
                )));
            };
            next.editing = Some(EditDraft {
                original: current.entry.clone(),
                fields: state.form_spec.prefill(&current.entry.fields),
            });
            Vec::new()
        }
        Event::SetEditField { name, value } => {
            next.require(step == Step::EditForm, "edit input")?;
            let spec = next.form_spec.clone();
            if let Some(draft) = next.editing.as_mut() {
                spec.set(&mut draft.fields, &name, value)?;
            }
            Vec::new()
        }
        Event::CancelEdit => {
            next.require(step == Step::EditForm, "cancel")?;
            next.editing = None;
            Vec::new()
        }
        Event::Submitted => {
            next.require(step == Step::EnterForm, "submit")?;
            if state.options.center_from_session {
                next.clear_student();
            } else {
                next.clear_center();
            }
            next.stage_effects()
        }
        Event::EditFinished => {
            next.require(step == Step::EditForm, "saving an edit")?;
            next.editing = None;
            vec![next.load_entries()]
        }
        Event::BackToMenu => {
            next.reset_to_menu();
            Vec::new()
        }
        Event::Refresh => next.stage_effects(),
    };

    Ok((next, effects))
}
