const HEADER_LEN: usize = 4;

/// Packet buffers owned by a connection and reused across commands
#[derive(Debug)]
pub struct BufferSet {
    /// Payload of the most recent packet; overwritten by the next read
    pub read_buffer: Vec<u8>,

    // [header space][command payload, may exceed one packet]
    command: Vec<u8>,
}

impl BufferSet {
    pub fn new() -> Self {
        Self {
            read_buffer: Vec::new(),
            command: vec![0; HEADER_LEN],
        }
    }

    /// Start a new command, keeping the allocation. Returns the buffer to
    /// append the payload to.
    #[inline]
    pub fn new_command(&mut self) -> &mut Vec<u8> {
        self.command.clear();
        self.command.resize(HEADER_LEN, 0);
        &mut self.command
    }

    /// Header space followed by the payload, ready for `write_payload`
    #[inline]
    pub fn command_mut(&mut self) -> &mut [u8] {
        &mut self.command
    }

    #[inline]
    pub fn command_len(&self) -> usize {
        self.command.len().saturating_sub(HEADER_LEN)
    }
}

impl Default for BufferSet {
    fn default() -> Self {
        Self::new()
    }
}
