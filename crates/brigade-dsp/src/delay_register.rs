/// The BBD's charge buckets: a fixed ring of held samples.
///
/// One write per capture event, one read per emit event. Reads return the
/// oldest bucket: a value captured in one capture/emit pair is emitted
/// `capacity - 1` pairs later. `last` is the value the output sample-and-hold
/// currently presents.
#[derive(Clone, Debug)]
pub struct DelayRegister {
    buckets: Box<[f64]>,
    cursor: usize,
    last: f64,
}

impl DelayRegister {
    /// `capacity` is clamped to at least one bucket.
    pub fn new(capacity: usize) -> Self {
        Self {
            buckets: vec![0.0; capacity.max(1)].into_boxed_slice(),
            cursor: 0,
            last: 0.0,
        }
    }

    /// Store a captured value into the bucket under the cursor.
    #[inline]
    pub fn write(&mut self, value: f64) {
        self.buckets[self.cursor] = value;
        self.cursor += 1;
        if self.cursor == self.buckets.len() {
            self.cursor = 0;
        }
    }

    /// The bucket under the cursor (the oldest stored value). Updates `last`.
    #[inline]
    pub fn read(&mut self) -> f64 {
        self.last = self.buckets[self.cursor];
        self.last
    }

    /// Change in the held output since the previous read.
    #[inline]
    pub fn read_delta(&mut self) -> f64 {
        let prev = self.last;
        self.read() - prev
    }

    pub fn last(&self) -> f64 {
        self.last
    }

    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub fn reset(&mut self) {
        self.buckets.fill(0.0);
        self.cursor = 0;
        self.last = 0.0;
    }

    pub fn is_silent(&self) -> bool {
        self.last == 0.0 && self.buckets.iter().all(|&v| v == 0.0)
    }
}
