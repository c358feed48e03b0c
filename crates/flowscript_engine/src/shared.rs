// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sharing a script between an editor thread and an evaluation loop.

use crate::script::NodeScript;
use parking_lot::Mutex;
use std::sync::Arc;

/// A script behind a mutex, cloneable across threads.
///
/// The lock is held for one whole run pass or one structural operation at
/// a time; runs never observe a half-applied edit.
#[derive(Debug, Clone)]
pub struct SharedScript {
    inner: Arc<Mutex<NodeScript>>,
}

impl SharedScript {
    /// Wrap a script for sharing.
    pub fn new(script: NodeScript) -> Self {
        Self {
            inner: Arc::new(Mutex::new(script)),
        }
    }

    /// Evaluate the script once, under the lock.
    pub fn run(&self) {
        self.inner.lock().run();
    }

    /// Apply one structural operation under the lock.
    pub fn edit<R>(&self, f: impl FnOnce(&mut NodeScript) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Read from the script under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&NodeScript) -> R) -> R {
        f(&self.inner.lock())
    }
}

impl From<NodeScript> for SharedScript {
    fn from(script: NodeScript) -> Self {
        Self::new(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::testing;

    #[test]
    fn test_edits_and_runs_interleave_across_threads() {
        let registry = testing::registry();
        let mut script = NodeScript::new("shared");
        let constant = script.add_node(registry.get("test_constant").unwrap()).unwrap();
        let exit = script.add_node(registry.get("test_exit").unwrap()).unwrap();
        script.update_storage(constant, &testing::constant_blob(5.0)).unwrap();
        script
            .connect(
                testing::output_pin(&script, constant),
                testing::input_pins(&script, exit)[0],
            )
            .unwrap();

        let shared = SharedScript::new(script);
        let runner = shared.clone();
        let handle = std::thread::spawn(move || {
            for _ in 0..100 {
                runner.run();
            }
        });
        for _ in 0..100 {
            shared.edit(|script| {
                script.update_storage(constant, &testing::constant_blob(5.0)).unwrap();
            });
        }
        handle.join().unwrap();

        shared.run();
        assert_eq!(shared.read(|script| script.result::<f32>()), Some(5.0));
    }
}
