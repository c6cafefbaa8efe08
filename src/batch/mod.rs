//! Batch coordinator: apply one filter to many images, in order, on a worker
//! thread, with live progress, per-item failures and cooperative cancellation.
//!
//! ## Lifecycle
//!
//! ```text
//! BatchRequest ──prepare──▶ BatchRun (all items Pending)
//!                              │
//!                      execute / spawn
//!                              │
//!   for each item i of N:  cancel requested? ── yes ──▶ stop (rest stay Pending)
//!                              │ no
//!                          Progress(i * 100 / N)
//!                          load → filter → save (→ similarity)
//!                          item becomes Succeeded | Failed
//!                          ItemDone
//!                              │
//!                          Progress(100), Finished(summary)
//! ```
//!
//! A failing item never aborts the run, and neither does one that panics: it
//! is caught and recorded as `Failed(Internal)`. `Finished` is always the last
//! event, also for canceled runs, and the final progress is always 100 even
//! when not every item ran.
//!
//! The cancel flag is the only state shared between caller and worker. It is
//! checked once per item boundary, so an item already started runs to
//! completion. There is no timeout: a load or save that hangs stalls the run.

pub mod inputs;
pub mod naming;

pub use inputs::{enumerate_directory, resolve_inputs};
pub use naming::{OutputNaming, SuffixNaming};

use crate::codec::{CodecError, ImageCodec};
use crate::filters::{FilterError, FilterKind};
use crate::raster::{RasterBuffer, RasterError};
use crate::similarity::{Sensitivity, SimilarityError, similarity_score};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failures that stop a run before any item is processed.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error(transparent)]
    UnknownFilter(#[from] FilterError),
    #[error(transparent)]
    InvalidSensitivity(#[from] SimilarityError),
    #[error("No input images found")]
    NoInputs,
    #[error("Cannot read input directory {}: {message}", path.display())]
    Enumerate { path: PathBuf, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Batch worker panicked")]
    WorkerPanicked,
}

/// Why a single item failed. The source path lives on the owning
/// [`BatchItem`], so every failure stays attributable to one file.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemError {
    #[error("source not found")]
    NotFound,
    #[error("could not decode: {message}")]
    Decode { message: String },
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },
    #[error("could not write {}: {message}", output.display())]
    Write { output: PathBuf, message: String },
    /// The item panicked; the run carried on without it.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl From<CodecError> for ItemError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::NotFound(_) => ItemError::NotFound,
            CodecError::Decode { message, .. } => ItemError::Decode { message },
            CodecError::Write { path, message } => ItemError::Write {
                output: path,
                message,
            },
            CodecError::UnsupportedFormat(path) => ItemError::Write {
                output: path,
                message: "unsupported output format".into(),
            },
        }
    }
}

impl From<RasterError> for ItemError {
    fn from(err: RasterError) -> Self {
        ItemError::InvalidInput {
            reason: err.to_string(),
        }
    }
}

impl From<SimilarityError> for ItemError {
    fn from(err: SimilarityError) -> Self {
        ItemError::InvalidInput {
            reason: err.to_string(),
        }
    }
}

/// Per-item state. Moves from `Pending` to a terminal state exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Succeeded {
        #[serde(skip_serializing_if = "Option::is_none")]
        similarity: Option<u8>,
    },
    Failed {
        error: ItemError,
    },
}

impl ItemStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ItemStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub source: PathBuf,
    pub output: PathBuf,
    #[serde(flatten)]
    pub status: ItemStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub pending: usize,
    pub canceled: bool,
}

/// Notifications emitted by a running batch, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    /// Emitted before each item and once more (100) when the run ends.
    Progress { percent: u8 },
    /// An item reached its terminal status.
    ItemDone {
        index: usize,
        total: usize,
        item: BatchItem,
    },
    /// Always the final event of a run.
    Finished { summary: BatchSummary },
}

/// Shared soft-cancel flag. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Harmless after the run has finished.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// What the caller asks for when launching a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    /// Files and/or directories, in the order they should be processed.
    pub inputs: Vec<PathBuf>,
    pub filter_name: String,
    pub sensitivity: u32,
    /// Created if absent.
    pub output_dir: PathBuf,
    /// Score each result against its source and report it on `ItemDone`.
    pub score_similarity: bool,
}

/// One pass of a filter over an ordered list of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRun {
    pub filter: FilterKind,
    /// Only used when `score_similarity` is set.
    pub sensitivity: Sensitivity,
    pub score_similarity: bool,
    pub output_dir: PathBuf,
    pub items: Vec<BatchItem>,
    /// Last progress value reported.
    pub progress: u8,
    pub canceled: bool,
    /// Set once `execute` has run; a run is single-pass.
    #[serde(default)]
    pub finished: bool,
}

impl BatchRun {
    /// Validate the request and lay out the items with [`SuffixNaming`].
    pub fn prepare(request: &BatchRequest) -> Result<Self, BatchError> {
        Self::prepare_with_naming(request, &SuffixNaming)
    }

    /// Validate the request and lay out the items with a custom naming policy.
    ///
    /// The filter name and sensitivity are checked before inputs are
    /// resolved, and the output directory is only created once there is
    /// something to process.
    pub fn prepare_with_naming(
        request: &BatchRequest,
        naming: &dyn OutputNaming,
    ) -> Result<Self, BatchError> {
        let filter: FilterKind = request.filter_name.parse()?;
        let sensitivity = Sensitivity::new(request.sensitivity)?;

        let sources = resolve_inputs(&request.inputs)?;
        if sources.is_empty() {
            return Err(BatchError::NoInputs);
        }
        std::fs::create_dir_all(&request.output_dir)?;

        let items = sources
            .into_iter()
            .map(|source| BatchItem {
                output: naming.output_path(&source, filter, &request.output_dir),
                source,
                status: ItemStatus::Pending,
            })
            .collect();

        Ok(Self {
            filter,
            sensitivity,
            score_similarity: request.score_similarity,
            output_dir: request.output_dir.clone(),
            items,
            progress: 0,
            canceled: false,
            finished: false,
        })
    }

    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            total: self.items.len(),
            canceled: self.canceled,
            ..BatchSummary::default()
        };
        for item in &self.items {
            match item.status {
                ItemStatus::Pending => summary.pending += 1,
                ItemStatus::Succeeded { .. } => summary.succeeded += 1,
                ItemStatus::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }

    /// Process every item in order on the calling thread.
    ///
    /// Events go to `events` if given; a disconnected receiver is ignored.
    /// A run executes once: calling this again on a finished run touches no
    /// item and only repeats the closing `Progress(100)` and `Finished`.
    /// A panic while processing an item fails that item as
    /// [`ItemError::Internal`] and the run continues.
    pub fn execute(
        &mut self,
        codec: &dyn ImageCodec,
        cancel: &CancelToken,
        events: Option<&Sender<BatchEvent>>,
    ) {
        let emit = |event: BatchEvent| {
            if let Some(tx) = events {
                tx.send(event).ok();
            }
        };

        if self.finished {
            debug!("batch already finished, not re-running");
            emit(BatchEvent::Progress { percent: 100 });
            emit(BatchEvent::Finished {
                summary: self.summary(),
            });
            return;
        }

        let total = self.items.len();
        info!(
            filter = %self.filter,
            items = total,
            output_dir = %self.output_dir.display(),
            "batch started"
        );

        for index in 0..total {
            if cancel.is_canceled() {
                info!(completed = index, remaining = total - index, "batch canceled");
                self.canceled = true;
                break;
            }

            self.progress = (index * 100 / total) as u8;
            emit(BatchEvent::Progress {
                percent: self.progress,
            });

            let item = &self.items[index];
            if item.status.is_terminal() {
                debug!(index, source = %item.source.display(), "item already done, skipping");
                continue;
            }
            debug!(index, source = %item.source.display(), "processing item");
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                self.process_item(&item.source, &item.output, codec)
            }))
            .unwrap_or_else(|payload| {
                Err(ItemError::Internal {
                    message: panic_message(&*payload),
                })
            });
            let status = match outcome {
                Ok(similarity) => ItemStatus::Succeeded { similarity },
                Err(error) => {
                    warn!(source = %item.source.display(), %error, "item failed");
                    ItemStatus::Failed { error }
                }
            };

            self.items[index].status = status;
            emit(BatchEvent::ItemDone {
                index,
                total,
                item: self.items[index].clone(),
            });
        }

        self.progress = 100;
        self.finished = true;
        emit(BatchEvent::Progress { percent: 100 });

        let summary = self.summary();
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            pending = summary.pending,
            canceled = summary.canceled,
            "batch finished"
        );
        emit(BatchEvent::Finished { summary });
    }

    fn process_item(
        &self,
        source: &Path,
        output: &Path,
        codec: &dyn ImageCodec,
    ) -> Result<Option<u8>, ItemError> {
        let original: RasterBuffer = codec.load(source)?;
        let filtered = self.filter.apply(&original)?;
        codec.save(&filtered, output)?;

        if self.score_similarity {
            Ok(Some(similarity_score(
                &original,
                &filtered,
                self.sensitivity,
            )?))
        } else {
            Ok(None)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

/// A batch running on its own thread.
///
/// Drain [`events`](Self::events) until it closes, then [`wait`](Self::wait)
/// for the final run state.
pub struct BatchHandle {
    cancel: CancelToken,
    events: Receiver<BatchEvent>,
    worker: JoinHandle<BatchRun>,
}

impl BatchHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Event stream; ends after `Finished` once the worker drops its sender.
    pub fn events(&self) -> &Receiver<BatchEvent> {
        &self.events
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Block until the worker returns the completed run.
    pub fn wait(self) -> Result<BatchRun, BatchError> {
        self.worker.join().map_err(|_| BatchError::WorkerPanicked)
    }
}

/// Run `run` on a new worker thread so the caller is never blocked.
pub fn spawn<C>(mut run: BatchRun, codec: C) -> BatchHandle
where
    C: ImageCodec + 'static,
{
    let cancel = CancelToken::new();
    let (tx, rx) = mpsc::channel();
    let worker_cancel = cancel.clone();
    let worker = std::thread::spawn(move || {
        run.execute(&codec, &worker_cancel, Some(&tx));
        run
    });
    BatchHandle {
        cancel,
        events: rx,
        worker,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::backend::tests::{MockCodec, RecordedOp};
    use crate::test_helpers::*;
    use tempfile::TempDir;

    fn request(inputs: &[&str], filter: &str, output_dir: &Path) -> BatchRequest {
        BatchRequest {
            inputs: inputs.iter().map(PathBuf::from).collect(),
            filter_name: filter.to_string(),
            sensitivity: 16,
            output_dir: output_dir.to_path_buf(),
            score_similarity: false,
        }
    }

    fn codec_with(paths: &[&str]) -> MockCodec {
        paths.iter().enumerate().fold(MockCodec::new(), |codec, (i, p)| {
            codec.with_image(*p, noisy(12, 9, i as u64))
        })
    }

    fn run_collecting(
        run: &mut BatchRun,
        codec: &MockCodec,
        cancel: &CancelToken,
    ) -> Vec<BatchEvent> {
        let (tx, rx) = mpsc::channel();
        run.execute(codec, cancel, Some(&tx));
        drop(tx);
        rx.iter().collect()
    }

    fn progress_values(events: &[BatchEvent]) -> Vec<u8> {
        events
            .iter()
            .filter_map(|e| match e {
                BatchEvent::Progress { percent } => Some(*percent),
                _ => None,
            })
            .collect()
    }

    // =========================================================================
    // Preparation
    // =========================================================================

    #[test]
    fn prepare_lays_out_pending_items_with_suffix_names() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out");
        let run = BatchRun::prepare(&request(&["/in/a.png", "/in/b.jpg"], "Sharpen", &out))
            .unwrap();

        assert!(out.is_dir(), "output directory should be created");
        assert_eq!(run.filter, FilterKind::Sharpen);
        assert_eq!(run.items.len(), 2);
        assert_eq!(run.items[0].output, out.join("a_sharpen.png"));
        assert_eq!(run.items[1].output, out.join("b_sharpen.jpg"));
        assert!(run.items.iter().all(|i| i.status == ItemStatus::Pending));
    }

    #[test]
    fn unknown_filter_is_rejected_before_anything_happens() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out");
        let err = BatchRun::prepare(&request(&["/in/a.png"], "emboss", &out)).unwrap_err();
        assert!(matches!(
            err,
            BatchError::UnknownFilter(FilterError::UnknownFilter(_))
        ));
        assert!(!out.exists());
    }

    #[test]
    fn zero_sensitivity_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut req = request(&["/in/a.png"], "average", tmp.path());
        req.sensitivity = 0;
        assert!(matches!(
            BatchRun::prepare(&req).unwrap_err(),
            BatchError::InvalidSensitivity(SimilarityError::InvalidSensitivity(0))
        ));
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let empty_dir = tmp.path().join("empty");
        std::fs::create_dir(&empty_dir).unwrap();

        let err = BatchRun::prepare(&request(&[], "average", tmp.path())).unwrap_err();
        assert!(matches!(err, BatchError::NoInputs));

        let req = BatchRequest {
            inputs: vec![empty_dir],
            ..request(&[], "average", tmp.path())
        };
        assert!(matches!(
            BatchRun::prepare(&req).unwrap_err(),
            BatchError::NoInputs
        ));
    }

    #[test]
    fn duplicate_inputs_are_collapsed() {
        let tmp = TempDir::new().unwrap();
        let run = BatchRun::prepare(&request(
            &["/in/a.png", "/in/b.png", "/in/a.png"],
            "average",
            tmp.path(),
        ))
        .unwrap();
        let sources: Vec<_> = run.items.iter().map(|i| i.source.clone()).collect();
        assert_eq!(
            sources,
            vec![PathBuf::from("/in/a.png"), PathBuf::from("/in/b.png")]
        );
    }

    #[test]
    fn custom_naming_policy_is_used() {
        struct Flat;
        impl OutputNaming for Flat {
            fn output_path(&self, source: &Path, _: FilterKind, dir: &Path) -> PathBuf {
                dir.join(source.file_name().unwrap())
            }
        }
        let tmp = TempDir::new().unwrap();
        let run = BatchRun::prepare_with_naming(
            &request(&["/in/a.png"], "negative", tmp.path()),
            &Flat,
        )
        .unwrap();
        assert_eq!(run.items[0].output, tmp.path().join("a.png"));
    }

    // =========================================================================
    // Execution
    // =========================================================================

    #[test]
    fn valid_and_missing_inputs_are_isolated() {
        let tmp = TempDir::new().unwrap();
        let inputs = ["/in/a.png", "/in/missing1.png", "/in/b.png", "/in/missing2.png"];
        let codec = codec_with(&["/in/a.png", "/in/b.png"]);
        let mut run = BatchRun::prepare(&request(&inputs, "negative", tmp.path())).unwrap();

        let events = run_collecting(&mut run, &codec, &CancelToken::new());

        let summary = run.summary();
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.pending, 0);
        assert!(!summary.canceled);
        assert_eq!(
            run.items[1].status,
            ItemStatus::Failed {
                error: ItemError::NotFound
            }
        );
        assert_eq!(
            run.items[3].status,
            ItemStatus::Failed {
                error: ItemError::NotFound
            }
        );

        let finished = events
            .iter()
            .filter(|e| matches!(e, BatchEvent::Finished { .. }))
            .count();
        assert_eq!(finished, 1);
        assert!(matches!(events.last(), Some(BatchEvent::Finished { .. })));
        assert_eq!(progress_values(&events), vec![0, 25, 50, 75, 100]);
    }

    #[test]
    fn outputs_are_filtered_and_written() {
        let tmp = TempDir::new().unwrap();
        let codec = MockCodec::new().with_image("/in/a.png", uniform(5, 5, 128));
        let mut run = BatchRun::prepare(&request(&["/in/a.png"], "negative", tmp.path())).unwrap();
        run.execute(&codec, &CancelToken::new(), None);

        let saved = codec.saved_image(&tmp.path().join("a_negative.png")).unwrap();
        assert_eq!(saved, uniform(5, 5, 127));
        assert_eq!(
            codec.get_operations(),
            vec![
                RecordedOp::Load("/in/a.png".into()),
                RecordedOp::Save(tmp.path().join("a_negative.png")),
            ]
        );
    }

    #[test]
    fn items_are_processed_in_input_order() {
        let tmp = TempDir::new().unwrap();
        let inputs = ["/in/c.png", "/in/a.png", "/in/b.png"];
        let codec = codec_with(&inputs);
        let mut run = BatchRun::prepare(&request(&inputs, "average", tmp.path())).unwrap();
        let events = run_collecting(&mut run, &codec, &CancelToken::new());

        let loaded: Vec<PathBuf> = inputs.iter().map(PathBuf::from).collect();
        assert_eq!(codec.loaded_paths(), loaded);

        let done: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                BatchEvent::ItemDone { index, .. } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(done, vec![0, 1, 2]);
    }

    #[test]
    fn progress_precedes_each_item_and_never_decreases() {
        let tmp = TempDir::new().unwrap();
        let inputs = ["/in/1.png", "/in/2.png", "/in/3.png"];
        let codec = codec_with(&inputs);
        let mut run = BatchRun::prepare(&request(&inputs, "laplacian", tmp.path())).unwrap();
        let events = run_collecting(&mut run, &codec, &CancelToken::new());

        // 0/3, 1/3, 2/3 floored, then the terminal 100
        assert_eq!(progress_values(&events), vec![0, 33, 66, 100]);
        assert!(matches!(events[0], BatchEvent::Progress { percent: 0 }));
        assert!(matches!(events[1], BatchEvent::ItemDone { index: 0, .. }));
        assert_eq!(run.progress, 100);
    }

    #[test]
    fn write_failure_is_attributed_to_its_item() {
        let tmp = TempDir::new().unwrap();
        let bad_output = tmp.path().join("a_average.png");
        let codec = codec_with(&["/in/a.png", "/in/b.png"]).with_failing_save(&bad_output);
        let mut run =
            BatchRun::prepare(&request(&["/in/a.png", "/in/b.png"], "average", tmp.path()))
                .unwrap();
        run.execute(&codec, &CancelToken::new(), None);

        assert_eq!(run.items[0].source, PathBuf::from("/in/a.png"));
        assert!(matches!(
            &run.items[0].status,
            ItemStatus::Failed { error: ItemError::Write { output, .. } } if *output == bad_output
        ));
        assert!(matches!(
            run.items[1].status,
            ItemStatus::Succeeded { similarity: None }
        ));
    }

    #[test]
    fn malformed_buffer_fails_as_invalid_input() {
        let tmp = TempDir::new().unwrap();
        let malformed = RasterBuffer {
            width: 4,
            height: 4,
            samples: vec![0; 3],
        };
        let codec = MockCodec::new().with_image("/in/bad.png", malformed);
        let mut run =
            BatchRun::prepare(&request(&["/in/bad.png"], "sharpen", tmp.path())).unwrap();
        run.execute(&codec, &CancelToken::new(), None);

        assert!(matches!(
            run.items[0].status,
            ItemStatus::Failed {
                error: ItemError::InvalidInput { .. }
            }
        ));
        assert!(codec.saved.lock().unwrap().is_empty());
    }

    #[test]
    fn similarity_is_reported_when_requested() {
        let tmp = TempDir::new().unwrap();
        let codec = MockCodec::new().with_image("/in/gray.png", uniform(10, 10, 128));
        let mut req = request(&["/in/gray.png"], "negative", tmp.path());
        req.score_similarity = true;
        let mut run = BatchRun::prepare(&req).unwrap();
        let events = run_collecting(&mut run, &codec, &CancelToken::new());

        let expected = ItemStatus::Succeeded {
            similarity: Some(100),
        };
        assert_eq!(run.items[0].status, expected);
        assert!(events.iter().any(
            |e| matches!(e, BatchEvent::ItemDone { item, .. } if item.status == expected)
        ));
    }

    // =========================================================================
    // Cancellation
    // =========================================================================

    #[test]
    fn cancel_during_item_k_leaves_later_items_pending() {
        let tmp = TempDir::new().unwrap();
        let inputs = ["/in/0.png", "/in/1.png", "/in/2.png", "/in/3.png", "/in/4.png"];
        let cancel = CancelToken::new();
        let hook_cancel = cancel.clone();
        let codec = codec_with(&inputs).with_load_hook(move |path| {
            if path == Path::new("/in/1.png") {
                hook_cancel.cancel();
            }
        });
        let mut run = BatchRun::prepare(&request(&inputs, "average", tmp.path())).unwrap();
        let events = run_collecting(&mut run, &codec, &cancel);

        // item 1 was in flight when cancel arrived and still completes
        assert!(run.items[..2].iter().all(|i| i.status.is_terminal()));
        assert!(
            run.items[2..]
                .iter()
                .all(|i| i.status == ItemStatus::Pending)
        );
        assert_eq!(codec.loaded_paths().len(), 2);

        let summary = run.summary();
        assert!(summary.canceled);
        assert_eq!((summary.succeeded, summary.pending), (2, 3));

        assert_eq!(progress_values(&events), vec![0, 20, 100]);
        assert!(matches!(
            events.last(),
            Some(BatchEvent::Finished { summary }) if summary.canceled
        ));
    }

    #[test]
    fn cancel_before_start_runs_nothing_but_still_finishes() {
        let tmp = TempDir::new().unwrap();
        let codec = codec_with(&["/in/a.png"]);
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut run = BatchRun::prepare(&request(&["/in/a.png"], "average", tmp.path())).unwrap();
        let events = run_collecting(&mut run, &codec, &cancel);

        assert!(codec.get_operations().is_empty());
        assert_eq!(run.items[0].status, ItemStatus::Pending);
        assert_eq!(progress_values(&events), vec![100]);
        assert!(matches!(events.last(), Some(BatchEvent::Finished { .. })));
    }

    #[test]
    fn cancel_after_finish_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let codec = codec_with(&["/in/a.png"]);
        let cancel = CancelToken::new();
        let mut run = BatchRun::prepare(&request(&["/in/a.png"], "average", tmp.path())).unwrap();
        run.execute(&codec, &cancel, None);
        let before = run.clone();

        cancel.cancel();
        assert_eq!(run, before);
        assert!(!run.summary().canceled);
        assert_eq!(run.summary().succeeded, 1);
    }

    #[test]
    fn second_execute_does_not_revisit_items() {
        let tmp = TempDir::new().unwrap();
        let inputs = ["/in/a.png", "/in/b.png"];
        let codec = codec_with(&inputs);
        let mut run = BatchRun::prepare(&request(&inputs, "negative", tmp.path())).unwrap();
        run_collecting(&mut run, &codec, &CancelToken::new());
        assert!(run.finished);
        let before = run.clone();

        let events = run_collecting(&mut run, &codec, &CancelToken::new());

        assert_eq!(run, before);
        assert_eq!(codec.loaded_paths().len(), 2);
        assert_eq!(
            events,
            vec![
                BatchEvent::Progress { percent: 100 },
                BatchEvent::Finished {
                    summary: before.summary()
                },
            ]
        );
    }

    #[test]
    fn terminal_items_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let inputs = ["/in/a.png", "/in/b.png"];
        let codec = codec_with(&inputs);
        let mut run = BatchRun::prepare(&request(&inputs, "negative", tmp.path())).unwrap();
        run.items[0].status = ItemStatus::Failed {
            error: ItemError::NotFound,
        };

        let events = run_collecting(&mut run, &codec, &CancelToken::new());

        assert_eq!(codec.loaded_paths(), vec![PathBuf::from("/in/b.png")]);
        assert_eq!(
            run.items[0].status,
            ItemStatus::Failed {
                error: ItemError::NotFound
            }
        );
        let done: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                BatchEvent::ItemDone { index, .. } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(done, vec![1]);
    }

    // =========================================================================
    // Worker thread
    // =========================================================================

    #[test]
    fn spawned_run_streams_events_and_returns_run() {
        let tmp = TempDir::new().unwrap();
        let inputs = ["/in/a.png", "/in/b.png"];
        let codec = codec_with(&inputs);
        let run = BatchRun::prepare(&request(&inputs, "logarithm", tmp.path())).unwrap();

        let handle = spawn(run, codec);
        let events: Vec<BatchEvent> = handle.events().iter().collect();
        let run = handle.wait().unwrap();

        assert_eq!(run.summary().succeeded, 2);
        assert_eq!(progress_values(&events), vec![0, 50, 100]);
        assert!(matches!(events.last(), Some(BatchEvent::Finished { .. })));
    }

    #[test]
    fn spawned_run_can_be_canceled_from_the_handle() {
        let tmp = TempDir::new().unwrap();
        let inputs = ["/in/a.png", "/in/b.png", "/in/c.png"];
        let (entered_tx, entered_rx) = mpsc::channel::<()>();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let gate_rx = std::sync::Mutex::new(gate_rx);
        // block inside the first load until the test has canceled
        let codec = codec_with(&inputs).with_load_hook(move |path| {
            if path == Path::new("/in/a.png") {
                entered_tx.send(()).ok();
                gate_rx.lock().unwrap().recv().ok();
            }
        });
        let run = BatchRun::prepare(&request(&inputs, "average", tmp.path())).unwrap();

        let handle = spawn(run, codec);
        entered_rx.recv().unwrap();
        handle.cancel();
        gate_tx.send(()).unwrap();
        let events: Vec<BatchEvent> = handle.events().iter().collect();
        let run = handle.wait().unwrap();

        let summary = run.summary();
        assert!(summary.canceled);
        assert_eq!(summary.succeeded + summary.failed, 1);
        assert_eq!(summary.pending, 2);
        assert!(matches!(events.last(), Some(BatchEvent::Finished { .. })));
    }

    #[test]
    fn panicking_item_fails_alone_and_run_finishes() {
        let tmp = TempDir::new().unwrap();
        let inputs = ["/in/0.png", "/in/1.png", "/in/2.png"];
        let codec = codec_with(&inputs).with_load_hook(|path| {
            if path == Path::new("/in/1.png") {
                panic!("codec exploded");
            }
        });
        let run = BatchRun::prepare(&request(&inputs, "average", tmp.path())).unwrap();

        let handle = spawn(run, codec);
        let events: Vec<BatchEvent> = handle.events().iter().collect();
        let run = handle.wait().unwrap();

        assert!(matches!(
            run.items[0].status,
            ItemStatus::Succeeded { .. }
        ));
        assert_eq!(
            run.items[1].status,
            ItemStatus::Failed {
                error: ItemError::Internal {
                    message: "codec exploded".into()
                }
            }
        );
        assert!(matches!(
            run.items[2].status,
            ItemStatus::Succeeded { .. }
        ));
        assert_eq!(progress_values(&events), vec![0, 33, 66, 100]);
        assert!(matches!(
            events.last(),
            Some(BatchEvent::Finished { summary }) if summary.failed == 1 && summary.succeeded == 2
        ));
    }

    #[test]
    fn report_serializes_statuses() {
        let item = BatchItem {
            source: "/in/a.png".into(),
            output: "/out/a_average.png".into(),
            status: ItemStatus::Failed {
                error: ItemError::NotFound,
            },
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"]["kind"], "not_found");
        assert_eq!(json["source"], "/in/a.png");

        let ok = ItemStatus::Succeeded {
            similarity: Some(87),
        };
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "succeeded");
        assert_eq!(json["similarity"], 87);
    }
}
