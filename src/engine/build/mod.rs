//! Image builds from a local build context.
//!
//! The build context directory is packed into a tar archive and streamed to
//! the engine. The engine answers with a stream of progress entries which must
//! be drained for the build to finish.

use std::pin::Pin;

use bollard::models::BuildInfo;
use bollard::query_parameters::{BuildImageOptions, BuildImageOptionsBuilder};
use bollard::{Docker, body_full};
use camino::{Utf8Path, Utf8PathBuf};
use futures_util::{Stream, StreamExt};
use tracing::{debug, info, instrument, trace};

mod archive;

use super::EngineConnector;
use crate::config::{AppConfig, BUILD_DEFINITION, IMAGE_TAG};
use crate::error::{ContainerError, RelaunchError};
pub use archive::pack_build_context;

/// Boxed stream type returned by [`ImageBuilder`] implementors.
pub type BuildStream<'a> =
    Pin<Box<dyn Stream<Item = Result<BuildInfo, bollard::errors::Error>> + Send + 'a>>;

/// Behaviour required to build an image from a tar build context.
pub trait ImageBuilder {
    /// Start a build of `context_tar` with the given options.
    fn build_image(&self, options: BuildImageOptions, context_tar: Vec<u8>) -> BuildStream<'_>;
}

impl ImageBuilder for Docker {
    fn build_image(&self, options: BuildImageOptions, context_tar: Vec<u8>) -> BuildStream<'_> {
        Box::pin(Self::build_image(
            self,
            options,
            None,
            Some(body_full(context_tar.into())),
        ))
    }
}

/// Parameters of a single image build.
///
/// The build always reads [`BUILD_DEFINITION`] from the context and removes
/// intermediate containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    tag: String,
    context_dir: Utf8PathBuf,
}

impl BuildRequest {
    /// Create a request building `context_dir` into `tag`.
    #[must_use]
    pub fn new(tag: impl Into<String>, context_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            tag: tag.into(),
            context_dir: context_dir.into(),
        }
    }

    /// Build a request for the fixed image tag from resolved configuration.
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(IMAGE_TAG, config.build.context_dir.clone())
    }

    /// Return the image tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Return the build context directory.
    #[must_use]
    pub fn context_dir(&self) -> &Utf8Path {
        &self.context_dir
    }
}

/// Outcome of a finished build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltImage {
    /// Tag applied to the image.
    pub tag: String,
    /// Image ID, when the engine reported one.
    pub id: Option<String>,
    /// Number of log lines passed to the line callback.
    pub log_lines: usize,
}

impl EngineConnector {
    /// Build an image, passing each trimmed log line to `on_line` in order.
    ///
    /// Entries without a `stream` field are not forwarded. The stream is
    /// drained to the end before the build is considered finished.
    ///
    /// # Errors
    ///
    /// Returns a `FilesystemError` when the context cannot be packed and
    /// `ContainerError::BuildFailed` when the engine reports an error entry or
    /// the stream fails.
    #[instrument(skip_all, fields(tag = request.tag()))]
    pub async fn build_image_async<B, F>(
        builder: &B,
        request: &BuildRequest,
        mut on_line: F,
    ) -> Result<BuiltImage, RelaunchError>
    where
        B: ImageBuilder + ?Sized,
        F: FnMut(&str),
    {
        let context_tar = pack_build_context(request.context_dir())?;
        debug!(
            context = %request.context_dir(),
            bytes = context_tar.len(),
            "packed build context"
        );

        let mut stream = builder.build_image(build_options(request), context_tar);
        let mut image_id = None;
        let mut log_lines = 0_usize;

        while let Some(item) = stream.next().await {
            let BuildInfo {
                stream: text,
                error_detail,
                aux,
                ..
            } = item.map_err(|error| build_failed(request, error.to_string()))?;

            if let Some(detail) = error_detail {
                let message = detail
                    .message
                    .unwrap_or_else(|| String::from("engine reported a build error"));
                return Err(build_failed(request, message));
            }

            if let Some(line) = text {
                let trimmed = line.trim();
                trace!(line = trimmed, "build output");
                on_line(trimmed);
                log_lines += 1;
            }

            if let Some(id) = aux.and_then(|image| image.id) {
                image_id = Some(id);
            }
        }

        info!(id = ?image_id, log_lines, "image built");
        Ok(BuiltImage {
            tag: String::from(request.tag()),
            id: image_id,
            log_lines,
        })
    }

    /// Build an image from synchronous code.
    ///
    /// Blocks on [`Self::build_image_async`] using the caller's runtime.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::build_image_async`].
    pub fn build_image<B, F>(
        runtime: &tokio::runtime::Handle,
        builder: &B,
        request: &BuildRequest,
        on_line: F,
    ) -> Result<BuiltImage, RelaunchError>
    where
        B: ImageBuilder + ?Sized,
        F: FnMut(&str),
    {
        runtime.block_on(Self::build_image_async(builder, request, on_line))
    }
}

fn build_options(request: &BuildRequest) -> BuildImageOptions {
    BuildImageOptionsBuilder::new()
        .dockerfile(BUILD_DEFINITION)
        .t(request.tag())
        .rm(true)
        .build()
}

fn build_failed(request: &BuildRequest, message: String) -> RelaunchError {
    RelaunchError::from(ContainerError::BuildFailed {
        image: String::from(request.tag()),
        message,
    })
}
