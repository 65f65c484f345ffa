use crate::{filter_items, resolve, Effect, HaltReason, Msg, RunState, Stage};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages that do not fit the current stage (or name an item that is not in
/// flight) are ignored.
pub fn update(mut state: RunState, msg: Msg) -> (RunState, Vec<Effect>) {
    let effects = match msg {
        Msg::SourceFetched(raw) if state.stage() == Stage::Fetching => {
            state.set_stage(Stage::Filtering);
            let total = raw.len();
            let filtered = filter_items(raw, &state.settings().rules);
            state.record_filtering(filtered.len(), total - filtered.len());

            state.set_stage(Stage::Resolving);
            let change_set = resolve(&filtered, state.watermark());
            if change_set.is_empty() {
                state.set_stage(Stage::Done);
                return (state, Vec::new());
            }
            state.load_change_set(change_set);
            state.begin_next_item().into_iter().collect()
        }
        Msg::SourceFailed(message) if state.stage() == Stage::Fetching => {
            state.halt(HaltReason::SourceUnavailable { message });
            Vec::new()
        }
        Msg::ItemTransformed { id, body }
            if state.stage() == Stage::Transforming && state.is_current(&id) =>
        {
            let image_url = state.current().and_then(|item| item.image_url.clone());
            state.set_stage(Stage::Publishing);
            vec![Effect::Publish {
                id,
                body,
                image_url,
            }]
        }
        Msg::TransformFailed { id, message }
            if state.stage() == Stage::Transforming && state.is_current(&id) =>
        {
            state.halt(HaltReason::TransformFailure { id, message });
            Vec::new()
        }
        Msg::ItemPublished { id, .. }
            if state.stage() == Stage::Publishing && state.is_current(&id) =>
        {
            state.set_stage(Stage::Committing);
            vec![Effect::CommitWatermark { id }]
        }
        Msg::PublishFailed {
            id,
            attempts,
            terminal,
            message,
        } if state.stage() == Stage::Publishing && state.is_current(&id) => {
            let reason = if terminal {
                HaltReason::PublishTerminal {
                    id,
                    attempts,
                    message,
                }
            } else {
                HaltReason::PublishExhausted {
                    id,
                    attempts,
                    message,
                }
            };
            state.halt(reason);
            Vec::new()
        }
        Msg::WatermarkCommitted { id }
            if state.stage() == Stage::Committing && state.is_current(&id) =>
        {
            state.commit(id);
            match state.begin_next_item() {
                Some(transform) => vec![Effect::Cooldown(state.settings().cooldown), transform],
                None => {
                    state.set_stage(Stage::Done);
                    Vec::new()
                }
            }
        }
        Msg::WatermarkFailed { id, message }
            if state.stage() == Stage::Committing && state.is_current(&id) =>
        {
            state.halt(HaltReason::PersistenceFailure { id, message });
            Vec::new()
        }
        _ => Vec::new(),
    };

    (state, effects)
}
