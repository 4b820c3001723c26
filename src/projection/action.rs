use super::FieldSpec;
use crate::transport::Method;
use std::fmt;

/// Every remote operation the client performs.
///
/// An action knows its endpoint and method, and which part of the response callers
/// get when they do not ask for a specific field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ListModels,
    ShowModel,
    Generate,
    Chat,
    CreateModel,
    CopyModel,
    DeleteModel,
    PullModel,
    PushModel,
    RunningModels,
    Embed,
    Embeddings,
    LoadModel,
    UnloadModel,
    CheckBlob,
    PushBlob,
    Version,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::ListModels => "list_models",
            Action::ShowModel => "show_model",
            Action::Generate => "generate",
            Action::Chat => "chat",
            Action::CreateModel => "create_model",
            Action::CopyModel => "copy_model",
            Action::DeleteModel => "delete_model",
            Action::PullModel => "pull_model",
            Action::PushModel => "push_model",
            Action::RunningModels => "running_models",
            Action::Embed => "embed",
            Action::Embeddings => "embeddings",
            Action::LoadModel => "load_model",
            Action::UnloadModel => "unload_model",
            Action::CheckBlob => "check_blob",
            Action::PushBlob => "push_blob",
            Action::Version => "version",
        }
    }

    /// Endpoint path. Blob actions append the digest themselves.
    pub fn path(&self) -> &'static str {
        match self {
            Action::ListModels => "/api/tags",
            Action::ShowModel => "/api/show",
            Action::Generate | Action::LoadModel | Action::UnloadModel => "/api/generate",
            Action::Chat => "/api/chat",
            Action::CreateModel => "/api/create",
            Action::CopyModel => "/api/copy",
            Action::DeleteModel => "/api/delete",
            Action::PullModel => "/api/pull",
            Action::PushModel => "/api/push",
            Action::RunningModels => "/api/ps",
            Action::Embed => "/api/embed",
            Action::Embeddings => "/api/embeddings",
            Action::CheckBlob | Action::PushBlob => "/api/blobs",
            Action::Version => "/api/version",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Action::ListModels | Action::RunningModels | Action::Version => Method::Get,
            Action::CheckBlob => Method::Head,
            Action::DeleteModel => Method::Delete,
            _ => Method::Post,
        }
    }

    /// Spec used for [`FieldSpec::None`]. `None` here means the whole body.
    pub fn default_field(&self) -> Option<FieldSpec> {
        match self {
            Action::ListModels | Action::RunningModels => Some(FieldSpec::top("models")),
            Action::ShowModel => None,
            Action::Generate => Some(FieldSpec::top("response")),
            Action::Chat => Some(FieldSpec::nested("message", "content")),
            Action::CreateModel | Action::PullModel | Action::PushModel => {
                Some(FieldSpec::meta("body"))
            }
            Action::CopyModel
            | Action::DeleteModel
            | Action::CheckBlob
            | Action::PushBlob => Some(FieldSpec::meta("status")),
            Action::Embed => Some(FieldSpec::top("embeddings")),
            Action::Embeddings => Some(FieldSpec::top("embedding")),
            Action::LoadModel => Some(FieldSpec::top("done")),
            Action::UnloadModel => Some(FieldSpec::top("done_reason")),
            Action::Version => Some(FieldSpec::top("version")),
        }
    }

    /// Actions that need a model on the server and can recover from a missing one by pulling.
    pub fn uses_model(&self) -> bool {
        matches!(
            self,
            Action::Generate | Action::Chat | Action::Embed | Action::Embeddings
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
