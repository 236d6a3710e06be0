use chrono::{Duration, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::models::{Generation, StyleOption};

/// Bounded, newest-first store of completed generations.
pub struct GenerationHistory {
    entries: Mutex<VecDeque<Generation>>,
    capacity: usize,
}

impl GenerationHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    /// History pre-filled with the studio's sample gallery.
    pub fn seeded(capacity: usize) -> Self {
        let history = Self::new(capacity);
        let now = Utc::now();
        let samples = [
            ("1", "A stylish model in a futuristic city", StyleOption::Cyberpunk, 5),
            ("2", "Vintage polaroid of a 70s rockstar", StyleOption::Vintage, 15),
            ("3", "Detailed portrait of an elven queen", StyleOption::Fantasy, 30),
            ("4", "A highly detailed photograph of a designer dress", StyleOption::Photorealistic, 45),
            ("5", "Dynamic anime character in action pose", StyleOption::Anime, 60),
        ];

        // Oldest first so the newest sample ends up at the front.
        for (seed, prompt, style, minutes_ago) in samples.into_iter().rev() {
            let mut generation = Generation::new(
                format!("https://picsum.photos/seed/{}/512", seed),
                prompt,
                style,
            )
            .with_created_at(now - Duration::minutes(minutes_ago));
            generation.id = seed.to_string();
            history.push(generation);
        }

        history
    }

    pub fn push(&self, generation: Generation) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push_front(generation);
        entries.truncate(self.capacity);
    }

    pub fn recent(&self, limit: usize) -> Vec<Generation> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut recent: Vec<Generation> = entries.iter().cloned().collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent.truncate(limit);
        recent
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_history_is_newest_first() {
        let history = GenerationHistory::seeded(10);
        let recent = history.recent(5);
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].id, "1");
        assert_eq!(recent[4].id, "5");
        assert!(recent.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[test]
    fn test_empty_history_clamps_capacity() {
        let history = GenerationHistory::new(0);
        assert!(history.is_empty());
        assert_eq!(history.capacity(), 1);

        history.push(Generation::new("a", "one", StyleOption::Anime));
        history.push(Generation::new("b", "two", StyleOption::Anime));
        assert!(!history.is_empty());
        assert_eq!(history.recent(5).len(), 1);
        assert_eq!(history.recent(5)[0].prompt, "two");
    }

    #[test]
    fn test_push_respects_capacity() {
        let history = GenerationHistory::seeded(6);
        history.push(Generation::new("a", "first", StyleOption::Anime));
        history.push(Generation::new("b", "second", StyleOption::Anime));
        assert_eq!(history.len(), 6);

        let recent = history.recent(3);
        assert_eq!(recent[0].prompt, "second");
        assert_eq!(recent[1].prompt, "first");
        assert_eq!(recent[2].id, "1");
    }
}
