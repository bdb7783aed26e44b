use crate::models::FileDescriptor;

/// File attached to the message being composed.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpload {
    pub file_name: String,
    pub progress: u8,
    pub completed: bool,
    pub descriptor: Option<FileDescriptor>,
}

impl PendingUpload {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self { file_name: file_name.into(), progress: 0, completed: false, descriptor: None }
    }
}

/// Compose box state: text plus at most one pending upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComposeState {
    text: String,
    upload: Option<PendingUpload>,
}

impl ComposeState {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn upload(&self) -> Option<&PendingUpload> {
        self.upload.as_ref()
    }

    /// Whether the text holds anything but whitespace.
    pub fn is_typing(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// Sets the text; returns the new typing flag when it flipped.
    pub fn set_text(&mut self, text: impl Into<String>) -> Option<bool> {
        let was_typing = self.is_typing();
        self.text = text.into();
        let typing = self.is_typing();
        (typing != was_typing).then_some(typing)
    }

    /// Starts a new pending upload, replacing any previous one.
    pub fn attach(&mut self, file_name: impl Into<String>) {
        self.upload = Some(PendingUpload::new(file_name));
    }

    pub fn set_progress(&mut self, percent: u8) {
        if let Some(upload) = self.upload.as_mut() {
            upload.progress = percent.min(100);
        }
    }

    /// Marks the pending upload finished; ignored if the attachment was removed meanwhile.
    pub fn complete_upload(&mut self, descriptor: FileDescriptor) -> bool {
        match self.upload.as_mut() {
            Some(upload) => {
                upload.progress = 100;
                upload.completed = true;
                upload.descriptor = Some(descriptor);
                true
            }
            None => false,
        }
    }

    pub fn remove_upload(&mut self) {
        self.upload = None;
    }

    /// Descriptor of a completed upload ready to be sent.
    pub fn attached_file(&self) -> Option<&FileDescriptor> {
        self.upload
            .as_ref()
            .filter(|u| u.completed)
            .and_then(|u| u.descriptor.as_ref())
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.upload = None;
    }
}
