use memeshare_shared::{Comment, CommentId, CommentPatch, ImageChange, ImageUpload};

/// Uncommitted edit of one comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditStaging {
    pub target: CommentId,
    pub draft_text: String,
    pub image: ImageChange,
    had_image: bool,
}

impl EditStaging {
    pub fn begin(comment: &Comment) -> Self {
        Self {
            target: comment.id,
            draft_text: comment.text.clone().unwrap_or_default(),
            image: ImageChange::Unchanged,
            had_image: comment.image.is_some(),
        }
    }

    /// Whether the comment being edited already carries an image.
    pub fn had_image(&self) -> bool {
        self.had_image
    }

    /// `Some` stages a replacement. `None` stages removal of the current
    /// image, or drops a pending replacement when there is none.
    pub fn stage_image(&mut self, image: Option<ImageUpload>) {
        self.image = match image {
            Some(upload) => ImageChange::Replace(upload),
            None if self.had_image => ImageChange::Remove,
            None => ImageChange::Unchanged,
        };
    }

    /// An edit with no text, no image kept or staged and no removal flag is
    /// never submitted.
    pub fn is_empty(&self) -> bool {
        self.draft_text.trim().is_empty()
            && matches!(self.image, ImageChange::Unchanged)
            && !self.had_image
    }

    pub fn to_patch(&self) -> CommentPatch {
        CommentPatch {
            text: Some(self.draft_text.trim().to_string()),
            image: self.image.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use memeshare_shared::{ReactionSummary, User};

    use super::*;

    fn comment(text: Option<&str>, image: Option<&str>) -> Comment {
        Comment {
            id: 4,
            post_id: 1,
            parent_id: None,
            user: User {
                id: 1,
                username: "pepe".into(),
                avatar_url: String::new(),
            },
            text: text.map(str::to_string),
            image: image.map(str::to_string),
            created_at: "2024-01-01T00:00:00Z".into(),
            reaction: ReactionSummary::default(),
        }
    }

    fn upload() -> ImageUpload {
        ImageUpload {
            file_name: "doge.jpg".into(),
            content_type: "image/jpeg".into(),
            data: vec![0xff, 0xd8],
        }
    }

    #[test]
    fn begin_copies_text() {
        let staging = EditStaging::begin(&comment(Some("hi"), None));
        assert_eq!(staging.target, 4);
        assert_eq!(staging.draft_text, "hi");
        assert_eq!(staging.image, ImageChange::Unchanged);
    }

    #[test]
    fn blank_text_without_image_is_empty() {
        let mut staging = EditStaging::begin(&comment(Some("hi"), None));
        staging.draft_text = "   ".into();
        assert!(staging.is_empty());

        staging.stage_image(Some(upload()));
        assert!(!staging.is_empty());

        staging.stage_image(None);
        assert_eq!(staging.image, ImageChange::Unchanged);
        assert!(staging.is_empty());
    }

    #[test]
    fn removal_flag_makes_edit_submittable() {
        let mut staging = EditStaging::begin(&comment(None, Some("https://cdn/x.png")));
        assert!(!staging.is_empty());

        staging.stage_image(None);
        assert_eq!(staging.image, ImageChange::Remove);
        assert!(!staging.is_empty());
    }

    #[test]
    fn patch_trims_text() {
        let mut staging = EditStaging::begin(&comment(Some("hi"), None));
        staging.draft_text = "  edited  ".into();
        let patch = staging.to_patch();
        assert_eq!(patch.text.as_deref(), Some("edited"));
        assert_eq!(patch.image, ImageChange::Unchanged);
    }
}
