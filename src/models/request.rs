use serde::Serialize;

/// Optional modifiers attached to a sent message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Ask the server to consult the knowledge base
    pub use_rag: bool,
    pub use_image: bool,
    /// Base64 encoded image payload
    pub image_base64: Option<String>,
}

/// Wire body shared by the plain and the streaming message endpoints.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StreamRequest {
    pub content: String,
    pub use_rag: bool,
    pub use_image: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub skip: usize,
    pub limit: usize,
}

impl SendOptions {
    pub fn with_rag(mut self, use_rag: bool) -> Self {
        self.use_rag = use_rag;
        self
    }

    /// Attach an image; implies `use_image`.
    pub fn with_image(mut self, image_base64: impl Into<String>) -> Self {
        self.use_image = true;
        self.image_base64 = Some(image_base64.into());
        self
    }
}

impl StreamRequest {
    pub fn new(content: impl Into<String>, options: SendOptions) -> Self {
        Self {
            content: content.into(),
            use_rag: options.use_rag,
            use_image: options.use_image,
            image_base64: options.image_base64,
        }
    }
}

impl Page {
    pub fn first(limit: usize) -> Self {
        Self { skip: 0, limit }
    }
}
