use log::{debug, info, warn};
use thiserror::Error;

use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::block::{now_nanos, Block};
use super::crypto::Address;
use super::hash::Digest;
use super::pow::{self, MiningSignal};
use super::transaction::Transaction;
use crate::config::{ConfigError, LedgerConfig};

/// Errors that can occur during blockchain operations
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Invalid chain: no genesis block")]
    EmptyChain,

    #[error("Invalid chain: block {index} expects previous hash {expected}, found {found}")]
    BrokenLink {
        index: usize,
        expected: Digest,
        found: Digest,
    },

    #[error("Invalid chain: block {index} hash {hash} does not meet difficulty {difficulty}")]
    InvalidProof {
        index: usize,
        hash: Digest,
        difficulty: usize,
    },
}

/// Result of a mining cycle
#[derive(Debug, Clone, PartialEq)]
pub enum MineOutcome {
    /// A block was sealed and appended to the chain
    Mined(Block),

    /// The nonce search was stopped before it found a solution
    Aborted,
}

impl MineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, MineOutcome::Mined(_))
    }
}

#[derive(Debug)]
struct LedgerState {
    chain: Vec<Block>,
    pool: Vec<Transaction>,

    /// Set while a mining cycle holds a captured pool prefix
    sealing: bool,
}

impl LedgerState {
    fn last_hash(&self) -> Digest {
        // The chain holds a genesis block from construction onwards.
        self.chain.last().map(Block::hash).unwrap_or_default()
    }
}

/// Block fields captured at the start of a mining cycle
#[derive(Debug)]
struct SealJob {
    transactions: Vec<Transaction>,
    previous_hash: Digest,
    timestamp: i64,
}

/// Represents the blockchain
///
/// Chain and pool share a single lock. Mining and manual sealing are
/// additionally serialized by the commit mutex, so while a cycle is in
/// flight the pool only ever grows at its tail.
#[derive(Debug, Clone)]
pub struct Blockchain {
    /// Sealed blocks and pending transactions
    state: Arc<RwLock<LedgerState>>,

    /// Held for the whole of a mining or sealing cycle
    commit: Arc<Mutex<()>>,

    /// Stop signals of every cycle that is searching or waiting to
    signals: Arc<Mutex<Vec<MiningSignal>>>,

    /// Once triggered, no further cycle will search
    shutdown: MiningSignal,

    /// Address credited with mining rewards
    owner_address: Address,

    /// Mining difficulty (number of leading zeros required in hash)
    difficulty: usize,

    /// Mining reward
    mining_reward: f64,

    /// Log target for ledger records
    log_target: String,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Blockchain {
    /// Creates a new blockchain with a genesis block
    ///
    /// # Arguments
    ///
    /// * `config` - Owner address, difficulty, reward and log target
    ///
    /// # Returns
    ///
    /// A new Blockchain instance, or an error if the config is invalid
    pub fn new(config: LedgerConfig) -> Result<Self, BlockchainError> {
        config.validate()?;

        let blockchain = Blockchain {
            state: Arc::new(RwLock::new(LedgerState {
                chain: Vec::new(),
                pool: Vec::new(),
                sealing: false,
            })),
            commit: Arc::new(Mutex::new(())),
            signals: Arc::new(Mutex::new(Vec::new())),
            shutdown: MiningSignal::new(),
            owner_address: Address(config.owner_address),
            difficulty: config.difficulty,
            mining_reward: config.mining_reward,
            log_target: config.log_target,
        };

        blockchain.create_block(0, Block::default().hash());
        info!(
            target: blockchain.target(),
            "action=genesis, owner={}, difficulty={}",
            blockchain.owner_address,
            blockchain.difficulty
        );

        Ok(blockchain)
    }

    fn target(&self) -> &str {
        self.log_target.as_str()
    }

    fn read_state(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, LedgerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn owner_address(&self) -> &Address {
        &self.owner_address
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn mining_reward(&self) -> f64 {
        self.mining_reward
    }

    /// Adds a new transaction to the pending transactions
    ///
    /// No balance, duplicate or signature checks are made here.
    ///
    /// # Returns
    ///
    /// The index of the block that is expected to include this transaction.
    /// While a cycle is searching, its block is already spoken for and
    /// the transaction goes into the one after.
    pub fn add_transaction(&self, sender: Address, recipient: Address, amount: f64) -> usize {
        let transaction = Transaction::new(sender, recipient, amount);

        let mut state = self.write_state();
        debug!(target: self.target(), "action=add_transaction, {:?}", transaction);
        state.pool.push(transaction);

        if state.sealing {
            state.chain.len() + 1
        } else {
            state.chain.len()
        }
    }

    /// Seals the whole pending pool into a new block
    ///
    /// The pool is moved into the block and left empty. Used for the
    /// genesis block and for committing a nonce found elsewhere.
    pub fn create_block(&self, nonce: u64, previous_hash: Digest) -> Block {
        let _commit = lock(&self.commit);
        let mut state = self.write_state();

        let transactions = mem::take(&mut state.pool);
        let block = Block::new(nonce, previous_hash, transactions);
        state.chain.push(block.clone());

        block
    }

    /// Mines a new block with the pending transactions
    ///
    /// Equivalent to `mine_with_signal` with a fresh signal; the cycle can
    /// still be stopped through `abort_mining` or `shutdown`.
    pub fn mine(&self) -> MineOutcome {
        self.mine_with_signal(&MiningSignal::new())
    }

    /// Mines a new block, stopping early if `signal` is triggered
    ///
    /// The reward transaction is credited to the pool first. The pool,
    /// the last block hash and the seal timestamp are captured under the
    /// lock; the nonce search then runs without holding it. On success
    /// exactly the captured transactions leave the pool. On abort the
    /// reward is taken back out and the chain is untouched.
    ///
    /// The signal is registered before the cycle queues for the commit
    /// mutex, so `abort_mining` also reaches cycles that are still waiting.
    pub fn mine_with_signal(&self, signal: &MiningSignal) -> MineOutcome {
        lock(&self.signals).push(signal.clone());
        let outcome = self.run_cycle(signal);

        let mut signals = lock(&self.signals);
        if let Some(position) = signals.iter().position(|s| s.same_as(signal)) {
            signals.remove(position);
        }

        outcome
    }

    fn run_cycle(&self, signal: &MiningSignal) -> MineOutcome {
        let _commit = lock(&self.commit);

        if signal.is_triggered() || self.shutdown.is_triggered() {
            warn!(target: self.target(), "action=mining, status=aborted, stage=queued");
            return MineOutcome::Aborted;
        }

        let job = self.begin_seal();
        debug!(
            target: self.target(),
            "action=mining, status=searching, transactions={}, previous_hash={}",
            job.transactions.len(),
            job.previous_hash
        );

        let found = pow::find_nonce(
            &job.previous_hash,
            &job.transactions,
            job.timestamp,
            self.difficulty,
            signal,
        );

        self.finish_seal(job, found)
    }

    /// Credits the reward and captures the fields of the block to mine
    fn begin_seal(&self) -> SealJob {
        let mut state = self.write_state();
        state.pool.push(Transaction::new_reward(
            self.owner_address.clone(),
            self.mining_reward,
        ));
        state.sealing = true;

        SealJob {
            transactions: state.pool.clone(),
            previous_hash: state.last_hash(),
            timestamp: now_nanos(),
        }
    }

    /// Appends the mined block, or rolls the reward back if no nonce was found
    fn finish_seal(&self, job: SealJob, found: Option<u64>) -> MineOutcome {
        let mut state = self.write_state();
        state.sealing = false;

        match found {
            Some(nonce) => {
                let sealed = job.transactions.len();
                let block =
                    Block::with_timestamp(job.timestamp, nonce, job.previous_hash, job.transactions);
                state.pool.drain(..sealed);
                state.chain.push(block.clone());

                info!(
                    target: self.target(),
                    "action=mining, status=success, nonce={}, hash={}",
                    nonce,
                    block.hash()
                );
                MineOutcome::Mined(block)
            }
            None => {
                // The reward is the last captured entry; anything after it arrived mid-search.
                state.pool.remove(job.transactions.len() - 1);

                warn!(target: self.target(), "action=mining, status=aborted");
                MineOutcome::Aborted
            }
        }
    }

    /// Stops the running mining cycle and any cycles queued behind it
    ///
    /// # Returns
    ///
    /// true if at least one cycle was signalled
    pub fn abort_mining(&self) -> bool {
        let signals = lock(&self.signals);
        for signal in signals.iter() {
            signal.trigger();
        }

        !signals.is_empty()
    }

    /// Stops all current cycles and makes every later one abort at once
    pub fn shutdown(&self) -> bool {
        self.shutdown.trigger();
        self.abort_mining()
    }

    /// Checks whether a nonce search is currently running
    pub fn is_mining(&self) -> bool {
        self.read_state().sealing
    }

    /// Computes the balance of an address from sealed blocks only
    pub fn balance_of(&self, address: &Address) -> f64 {
        let state = self.read_state();

        let mut total = 0.0;
        for block in &state.chain {
            for transaction in block.transactions() {
                if transaction.recipient() == address {
                    total += transaction.amount();
                }
                if transaction.sender() == address {
                    total -= transaction.amount();
                }
            }
        }

        total
    }

    /// Gets the last block in the chain
    pub fn get_last_block(&self) -> Block {
        let state = self.read_state();
        state.chain.last().cloned().unwrap_or_default()
    }

    /// Gets a copy of every sealed block, in chain order
    pub fn dump_chain(&self) -> Vec<Block> {
        self.read_state().chain.clone()
    }

    /// Gets a copy of all pending transactions
    pub fn get_pending_transactions(&self) -> Vec<Transaction> {
        self.read_state().pool.clone()
    }

    /// Number of sealed blocks, genesis included
    pub fn len(&self) -> usize {
        self.read_state().chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_state().chain.is_empty()
    }

    /// Checks linkage and proof of work across the whole chain
    pub fn verify(&self) -> Result<(), BlockchainError> {
        let state = self.read_state();
        verify_blocks(&state.chain, self.difficulty)
    }

    /// Validates the blockchain
    pub fn is_valid(&self) -> bool {
        self.verify().is_ok()
    }

    /// Writes the chain through the logger, one section per block
    pub fn print(&self) {
        for (index, block) in self.dump_chain().iter().enumerate() {
            info!(
                target: self.target(),
                "{} Chain {} {}\n{}",
                "=".repeat(25),
                index,
                "=".repeat(25),
                block
            );
        }
        info!(target: self.target(), "{}", "*".repeat(25));
    }
}

/// Checks a sequence of blocks for hash linkage and proof of work
///
/// The genesis block is exempt from the proof check.
pub fn verify_blocks(chain: &[Block], difficulty: usize) -> Result<(), BlockchainError> {
    if chain.is_empty() {
        return Err(BlockchainError::EmptyChain);
    }

    for (index, pair) in chain.windows(2).enumerate() {
        let index = index + 1;
        let expected = pair[0].hash();
        let current = &pair[1];

        if current.previous_hash() != &expected {
            return Err(BlockchainError::BrokenLink {
                index,
                expected,
                found: *current.previous_hash(),
            });
        }

        let hash = current.hash();
        if !hash.meets_difficulty(difficulty) {
            return Err(BlockchainError::InvalidProof {
                index,
                hash,
                difficulty,
            });
        }
    }

    Ok(())
}
