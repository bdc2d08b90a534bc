use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use decode_bus::{WorkItem, WorkQueue};
use futures::StreamExt;
use image::ImageFormat;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConsumeSummary {
    pub items: u64,
    pub first_index: Option<u64>,
    pub last_index: Option<u64>,
    /// Items whose index did not follow the previous one.
    pub out_of_order: u64,
    pub bytes: u64,
}

impl ConsumeSummary {
    fn record<S>(&mut self, item: &WorkItem<S>) {
        if let Some(last) = self.last_index {
            if item.index != last + 1 {
                self.out_of_order += 1;
            }
        }
        self.first_index.get_or_insert(item.index);
        self.last_index = Some(item.index);
        self.items += 1;
        self.bytes += item.frames.current.as_raw().len() as u64;
    }
}

/// Drains the queue until the decoder drops its end.
pub async fn consume<S>(
    queue: Arc<WorkQueue<S>>,
    dump_dir: Option<PathBuf>,
) -> anyhow::Result<ConsumeSummary>
where
    S: Send + Sync + 'static,
{
    if let Some(dir) = &dump_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let mut summary = ConsumeSummary::default();
    let mut stream = std::pin::pin!(WorkQueue::as_stream(queue));
    while let Some(item) = stream.next().await {
        log::trace!("{}", item);
        summary.record(&item);

        if let Some(dir) = &dump_dir {
            let path = dir.join(format!("frame_{:08}.ppm", item.index));
            let current = item.frames.current.clone();
            tokio::task::spawn_blocking(move || {
                current
                    .image()
                    .save_with_format(&path, ImageFormat::Pnm)
                    .with_context(|| format!("failed to write {}", path.display()))
            })
            .await??;
        }
    }

    Ok(summary)
}
