//! Watch Loop Events

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};
use std::path::{Path, PathBuf};

/// Everything the watch loop reacts to, from every origin
#[derive(Debug)]
pub enum WatchEvent {
    /// A path appeared (created or renamed in)
    Created(PathBuf),
    /// A path disappeared (removed or renamed out)
    Removed(PathBuf),
    /// Contents or metadata of a path changed
    Modified(PathBuf),
    /// The OS watcher reported an error
    Failed(notify::Error),
    /// The debounce timer of the given generation expired
    TimerFired(u64),
    /// Stop the loop
    Stop,
}

impl WatchEvent {
    /// Split a notify event into one loop event per affected path.
    ///
    /// Access events are not interesting and produce nothing.
    pub fn from_notify(event: Event) -> Vec<WatchEvent> {
        match event.kind {
            EventKind::Create(_) => event.paths.into_iter().map(WatchEvent::Created).collect(),
            EventKind::Remove(_) => event.paths.into_iter().map(WatchEvent::Removed).collect(),
            EventKind::Modify(ModifyKind::Name(mode)) => match mode {
                RenameMode::To => event.paths.into_iter().map(WatchEvent::Created).collect(),
                RenameMode::From => event.paths.into_iter().map(WatchEvent::Removed).collect(),
                // paths are [from, to]
                RenameMode::Both => event
                    .paths
                    .into_iter()
                    .enumerate()
                    .map(|(i, path)| {
                        if i == 0 {
                            WatchEvent::Removed(path)
                        } else {
                            WatchEvent::Created(path)
                        }
                    })
                    .collect(),
                RenameMode::Any | RenameMode::Other => event
                    .paths
                    .into_iter()
                    .map(|path| {
                        if path.exists() {
                            WatchEvent::Created(path)
                        } else {
                            WatchEvent::Removed(path)
                        }
                    })
                    .collect(),
            },
            EventKind::Modify(_) | EventKind::Any => {
                event.paths.into_iter().map(WatchEvent::Modified).collect()
            }
            EventKind::Access(_) | EventKind::Other => Vec::new(),
        }
    }

    /// Filesystem path this event is about, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            WatchEvent::Created(path) | WatchEvent::Removed(path) | WatchEvent::Modified(path) => {
                Some(path)
            }
            WatchEvent::Failed(_) | WatchEvent::TimerFired(_) | WatchEvent::Stop => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind};

    fn kinds(events: &[WatchEvent]) -> Vec<&'static str> {
        events
            .iter()
            .map(|e| match e {
                WatchEvent::Created(_) => "created",
                WatchEvent::Removed(_) => "removed",
                WatchEvent::Modified(_) => "modified",
                WatchEvent::Failed(_) => "failed",
                WatchEvent::TimerFired(_) => "timer",
                WatchEvent::Stop => "stop",
            })
            .collect()
    }

    #[test]
    fn test_create_and_remove() {
        let created = Event::new(EventKind::Create(CreateKind::File)).add_path("/k/a".into());
        let removed = Event::new(EventKind::Remove(RemoveKind::Folder)).add_path("/k/d".into());

        assert_eq!(kinds(&WatchEvent::from_notify(created)), vec!["created"]);
        assert_eq!(kinds(&WatchEvent::from_notify(removed)), vec!["removed"]);
    }

    #[test]
    fn test_rename_both_splits_into_remove_and_create() {
        let event = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path("/k/old".into())
            .add_path("/k/new".into());

        let events = WatchEvent::from_notify(event);
        assert_eq!(kinds(&events), vec!["removed", "created"]);
        assert_eq!(events[0].path(), Some(Path::new("/k/old")));
        assert_eq!(events[1].path(), Some(Path::new("/k/new")));
    }

    #[test]
    fn test_rename_halves() {
        let from = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::From)))
            .add_path("/k/old".into());
        let to = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To)))
            .add_path("/k/new".into());

        assert_eq!(kinds(&WatchEvent::from_notify(from)), vec!["removed"]);
        assert_eq!(kinds(&WatchEvent::from_notify(to)), vec!["created"]);
    }

    #[test]
    fn test_ambiguous_rename_of_missing_path_is_removal() {
        let event = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Any)))
            .add_path("/definitely/not/here/kubemerger".into());

        assert_eq!(kinds(&WatchEvent::from_notify(event)), vec!["removed"]);
    }

    #[test]
    fn test_data_change_is_modification() {
        let event = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path("/k/a".into());

        assert_eq!(kinds(&WatchEvent::from_notify(event)), vec!["modified"]);
    }

    #[test]
    fn test_access_is_ignored() {
        let event = Event::new(EventKind::Access(AccessKind::Read)).add_path("/k/a".into());

        assert!(WatchEvent::from_notify(event).is_empty());
        assert!(WatchEvent::Stop.path().is_none());
    }
}
