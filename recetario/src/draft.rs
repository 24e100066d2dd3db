//! The draft editor: an explicit state machine over the one in-progress
//! recipe. All operations are pure transformations of in-memory state; the
//! persistence gateway only ever sees the committed result.

use serde::{Deserialize, Serialize};

use crate::basic_models::DraftRecipe;
use crate::fonts::RecipeFont;

/// A prepared source page image awaiting transcription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// A prepared dish photo attached to the draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DishPhoto {
    pub bytes: Vec<u8>,
    pub mime: String,
    /// Extension used when deriving the storage object name.
    pub extension: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftState {
    Empty,
    PagesCollected,
    Transcribing,
    Editable,
    Discarded,
    Committed,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum EditError {
    #[error("esta operación no está permitida en el estado {0:?}")]
    InvalidState(DraftState),
    #[error("añade al menos una página antes de analizar")]
    NoPages,
    #[error("no hay ninguna línea en la posición {0}")]
    OutOfBounds(usize),
    #[error("la receta necesita un título antes de guardarse")]
    MissingTitle,
}

/// The sanitized output of a committed draft, ready for the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedDraft {
    pub recipe: DraftRecipe,
    pub font: RecipeFont,
    pub photo: Option<DishPhoto>,
}

#[derive(Debug, Clone)]
pub struct DraftEditor {
    state: DraftState,
    pages: Vec<PageImage>,
    recipe: DraftRecipe,
    font: RecipeFont,
    photo: Option<DishPhoto>,
}

impl Default for DraftEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl DraftEditor {
    pub fn new() -> Self {
        Self {
            state: DraftState::Empty,
            pages: Vec::new(),
            recipe: DraftRecipe::default(),
            font: RecipeFont::default(),
            photo: None,
        }
    }

    /// Resume editing a draft the client already holds, e.g. one posted
    /// back with the save request.
    pub fn editable_from(recipe: DraftRecipe, font: RecipeFont) -> Self {
        Self {
            state: DraftState::Editable,
            pages: Vec::new(),
            recipe,
            font,
            photo: None,
        }
    }

    pub fn state(&self) -> DraftState {
        self.state
    }

    pub fn pages(&self) -> &[PageImage] {
        &self.pages
    }

    pub fn recipe(&self) -> &DraftRecipe {
        &self.recipe
    }

    pub fn font(&self) -> RecipeFont {
        self.font
    }

    // --- page collection ---

    pub fn add_page(&mut self, page: PageImage) -> Result<(), EditError> {
        match self.state {
            DraftState::Empty | DraftState::PagesCollected => {
                self.pages.push(page);
                self.state = DraftState::PagesCollected;
                Ok(())
            }
            other => Err(EditError::InvalidState(other)),
        }
    }

    pub fn remove_page(&mut self, index: usize) -> Result<(), EditError> {
        if self.state != DraftState::PagesCollected {
            return Err(EditError::InvalidState(self.state));
        }
        if index >= self.pages.len() {
            return Err(EditError::OutOfBounds(index));
        }
        self.pages.remove(index);
        if self.pages.is_empty() {
            self.state = DraftState::Empty;
        }
        Ok(())
    }

    // --- transcription ---

    /// Hand the collected pages to the transcription client. The actual
    /// call happens outside the editor; this only records the transition.
    pub fn begin_transcription(&mut self) -> Result<&[PageImage], EditError> {
        if self.state != DraftState::PagesCollected {
            return Err(EditError::InvalidState(self.state));
        }
        if self.pages.is_empty() {
            return Err(EditError::NoPages);
        }
        self.state = DraftState::Transcribing;
        Ok(&self.pages)
    }

    pub fn transcription_succeeded(&mut self, recipe: DraftRecipe) -> Result<(), EditError> {
        if self.state != DraftState::Transcribing {
            return Err(EditError::InvalidState(self.state));
        }
        self.recipe = recipe;
        self.state = DraftState::Editable;
        Ok(())
    }

    /// Transcription failed: back to collecting, pages preserved so the
    /// user can retake one and try again.
    pub fn transcription_failed(&mut self) -> Result<(), EditError> {
        if self.state != DraftState::Transcribing {
            return Err(EditError::InvalidState(self.state));
        }
        self.state = DraftState::PagesCollected;
        Ok(())
    }

    /// Manual entry: skip transcription and start from a blank editable
    /// draft with one empty line per list.
    pub fn start_manual(&mut self) -> Result<(), EditError> {
        if self.state != DraftState::Empty {
            return Err(EditError::InvalidState(self.state));
        }
        self.recipe = DraftRecipe {
            title: String::new(),
            ingredients: vec![String::new()],
            steps: vec![String::new()],
            notes: None,
        };
        self.font = RecipeFont::Libro;
        self.state = DraftState::Editable;
        Ok(())
    }

    // --- field edits ---

    fn editable(&mut self) -> Result<&mut DraftRecipe, EditError> {
        match self.state {
            DraftState::Editable => Ok(&mut self.recipe),
            other => Err(EditError::InvalidState(other)),
        }
    }

    pub fn set_title(&mut self, title: &str) -> Result<(), EditError> {
        self.editable()?.title = title.to_string();
        Ok(())
    }

    pub fn set_notes(&mut self, notes: Option<&str>) -> Result<(), EditError> {
        self.editable()?.notes = notes.map(String::from);
        Ok(())
    }

    pub fn set_font(&mut self, font: RecipeFont) -> Result<(), EditError> {
        self.editable()?;
        self.font = font;
        Ok(())
    }

    pub fn push_ingredient(&mut self) -> Result<(), EditError> {
        self.editable()?.ingredients.push(String::new());
        Ok(())
    }

    pub fn update_ingredient(&mut self, index: usize, text: &str) -> Result<(), EditError> {
        let lines = &mut self.editable()?.ingredients;
        let line = lines.get_mut(index).ok_or(EditError::OutOfBounds(index))?;
        *line = text.to_string();
        Ok(())
    }

    pub fn remove_ingredient(&mut self, index: usize) -> Result<(), EditError> {
        let lines = &mut self.editable()?.ingredients;
        if index >= lines.len() {
            return Err(EditError::OutOfBounds(index));
        }
        lines.remove(index);
        Ok(())
    }

    pub fn push_step(&mut self) -> Result<(), EditError> {
        self.editable()?.steps.push(String::new());
        Ok(())
    }

    pub fn update_step(&mut self, index: usize, text: &str) -> Result<(), EditError> {
        let lines = &mut self.editable()?.steps;
        let line = lines.get_mut(index).ok_or(EditError::OutOfBounds(index))?;
        *line = text.to_string();
        Ok(())
    }

    pub fn remove_step(&mut self, index: usize) -> Result<(), EditError> {
        let lines = &mut self.editable()?.steps;
        if index >= lines.len() {
            return Err(EditError::OutOfBounds(index));
        }
        lines.remove(index);
        Ok(())
    }

    /// Insert a blank step right after `index`, for composing multi-part
    /// steps without losing ordering. Entries before and at `index` keep
    /// their positions.
    pub fn insert_step_after(&mut self, index: usize) -> Result<(), EditError> {
        let lines = &mut self.editable()?.steps;
        if index >= lines.len() {
            return Err(EditError::OutOfBounds(index));
        }
        lines.insert(index + 1, String::new());
        Ok(())
    }

    // --- dish photo ---

    pub fn attach_photo(&mut self, photo: DishPhoto) -> Result<(), EditError> {
        self.editable()?;
        self.photo = Some(photo);
        Ok(())
    }

    pub fn remove_photo(&mut self) -> Result<(), EditError> {
        self.editable()?;
        self.photo = None;
        Ok(())
    }

    // --- terminal transitions ---

    pub fn discard(&mut self) {
        self.state = DraftState::Discarded;
        self.pages.clear();
        self.photo = None;
    }

    /// Sanitize and seal the draft. Requires a non-blank title.
    pub fn commit(mut self) -> Result<CommittedDraft, EditError> {
        if self.state != DraftState::Editable {
            return Err(EditError::InvalidState(self.state));
        }
        let recipe = self.recipe.sanitized();
        if recipe.title.is_empty() {
            return Err(EditError::MissingTitle);
        }
        self.state = DraftState::Committed;
        Ok(CommittedDraft {
            recipe,
            font: self.font,
            photo: self.photo,
        })
    }
}
