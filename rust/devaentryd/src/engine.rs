//! Runs the workflow against a record store.
//!
//! The engine owns the only mutable workflow state. Every event goes through
//! `workflow::reduce`; the effects it returns are executed here and their
//! results fed back through `Workflow::apply`.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{FlowError, UpdateFailure};
use crate::form::FormSpec;
use crate::model::{now_millis, Entry, Session};
use crate::reconcile::reconcile;
use crate::resolver::{resolve_centers, resolve_master_attributes, resolve_students};
use crate::session;
use crate::store::RecordStore;
use crate::update::{self, EditJournal, EditSaga};
use crate::workflow::{reduce, Completion, Effect, Event, Step, Workflow, WorkflowOptions};

/// Execute one fetch. Failures have already been degraded to empty data.
pub async fn execute(store: &dyn RecordStore, effect: Effect) -> Completion {
    match effect {
        Effect::LoadCenters { token } => Completion::Centers {
            token,
            centers: resolve_centers(store).await,
        },
        Effect::LoadStudents { token, center } => Completion::Students {
            token,
            students: resolve_students(store, &center).await,
        },
        Effect::LoadMaster {
            token,
            center,
            student,
        } => Completion::Master {
            token,
            attributes: resolve_master_attributes(store, &center, &student).await,
        },
        Effect::Reconcile {
            token,
            center,
            owner,
        } => Completion::Entries {
            token,
            entries: reconcile(store, &center, owner.as_deref()).await,
        },
    }
}

pub struct Engine {
    store: Arc<dyn RecordStore>,
    workflow: Workflow,
    journal: EditJournal,
}

impl Engine {
    pub fn new(store: Arc<dyn RecordStore>, options: WorkflowOptions, form: FormSpec) -> Self {
        Self {
            store,
            workflow: Workflow::new(options, form),
            journal: EditJournal::new(),
        }
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub async fn dispatch(&mut self, event: Event) -> Result<&Workflow, FlowError> {
        let (next, effects) = reduce(&self.workflow, event)?;
        self.workflow = next;
        for effect in effects {
            let completion = execute(self.store.as_ref(), effect).await;
            self.workflow.apply(completion);
        }
        Ok(&self.workflow)
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<Session, FlowError> {
        let session = session::login(self.store.as_ref(), username, password).await?;
        self.dispatch(Event::LoggedIn(session.clone())).await?;
        Ok(session)
    }

    pub async fn logout(&mut self) -> Result<(), FlowError> {
        if let Some(s) = self.workflow.session() {
            info!(username = %s.username, "session closed");
        }
        self.dispatch(Event::LoggedOut).await?;
        Ok(())
    }

    /// Validate and append the entry form for the selected student.
    pub async fn submit(&mut self) -> Result<Entry, FlowError> {
        let wf = &self.workflow;
        if wf.step() != Step::EnterForm {
            return Err(FlowError::NotReady(
                "select a center and a student before submitting".to_string(),
            ));
        }
        wf.form_spec().validate(wf.form())?;

        let entry = Entry {
            uid: update::new_uid(),
            timestamp: now_millis(),
            center_id: wf.selected_center().to_string(),
            username: wf.author(),
            student_name: wf.selected_student().to_string(),
            fields: wf.form().clone(),
        };
        update::create_entry(self.store.as_ref(), &entry).await?;
        self.dispatch(Event::Submitted).await?;
        Ok(entry)
    }

    /// Write the edit draft through the delete-then-create saga and relist.
    ///
    /// A rejected edit keeps the draft open so the user can retry. A partial
    /// one closes it, since the original row is gone either way.
    pub async fn save_edit(&mut self) -> Result<Entry, FlowError> {
        let Some(draft) = self.workflow.editing().cloned() else {
            return Err(FlowError::NotReady("no entry is being edited".to_string()));
        };
        self.workflow.form_spec().validate(&draft.fields)?;

        // Columns outside the form are carried over untouched.
        let mut fields = draft.original.fields.clone();
        fields.extend(draft.fields);

        let result =
            update::update_entry(self.store.as_ref(), &mut self.journal, &draft.original, fields)
                .await;
        match result {
            Ok(entry) => {
                self.dispatch(Event::EditFinished).await?;
                Ok(entry)
            }
            Err(e @ UpdateFailure::Rejected { .. }) => {
                warn!(uid = e.uid(), error = %e, "edit rejected");
                Err(e.into())
            }
            Err(e @ UpdateFailure::Partial { .. }) => {
                self.dispatch(Event::EditFinished).await?;
                Err(e.into())
            }
        }
    }

    pub fn torn_edits(&self) -> Vec<EditSaga> {
        self.journal.torn()
    }

    /// Re-issue the create of a torn edit, then relist if a listing is open.
    pub async fn recover(&mut self, uid: &str) -> Result<Entry, FlowError> {
        let entry = update::recover(self.store.as_ref(), &mut self.journal, uid).await?;
        if matches!(self.workflow.step(), Step::ViewList | Step::EditList) {
            self.dispatch(Event::Refresh).await?;
        }
        Ok(entry)
    }
}
