//! Watch - K8sAssistant の変更を dispatcher の key に変換する
//!
//! level-triggered なので、イベントの種類は見ずに key だけを enqueue する。
//! 削除イベントは流さない（get が NotFound を返すので何もしない）。

use std::pin::pin;

use futures::StreamExt;
use helmsman_core::app::{DispatcherHandle, Shutdown};
use helmsman_core::domain::ReleaseKey;
use kube::runtime::{WatchStreamExt, watcher};
use kube::{Api, Client, ResourceExt};
use tracing::{debug, info, warn};

use crate::crd::K8sAssistant;

/// `namespace` が None なら全 namespace を watch する
pub fn api(client: Client, namespace: Option<&str>) -> Api<K8sAssistant> {
    match namespace {
        Some(namespace) => Api::namespaced(client, namespace),
        None => Api::all(client),
    }
}

/// Key of a watched object. None when the object has no namespace.
pub fn key_of(object: &K8sAssistant) -> Option<ReleaseKey> {
    let namespace = object.namespace()?;
    Some(ReleaseKey::new(namespace, object.name_any()))
}

/// Feed applied objects into the dispatcher until shutdown or the stream ends.
///
/// Watch errors are retried by the stream's backoff.
pub async fn run(api: Api<K8sAssistant>, handle: DispatcherHandle, shutdown: Shutdown) {
    let stream = watcher(api, watcher::Config::default())
        .default_backoff()
        .applied_objects();
    let mut stream = pin!(stream);
    info!("watch started");

    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = stream.next() => next,
        };
        match next {
            Some(Ok(object)) => match key_of(&object) {
                Some(key) => {
                    debug!(%key, "change observed");
                    handle.enqueue(key).await;
                }
                None => warn!(name = %object.name_any(), "ignoring object without namespace"),
            },
            Some(Err(err)) => warn!(error = %err, "watch error"),
            None => break,
        }
    }
    info!("watch stopped");
}
