//! Ledger integration tests
//!
//! Drive the public API end to end: mining, chain validation, the UTXO
//! ledger and wallet key files.

use gossip_ledger::core::{validate_chain, Block, Blockchain, Payload, ProofOfWork, Transaction};
use gossip_ledger::error::LedgerError;
use gossip_ledger::network::{Server, SyncOutcome};
use gossip_ledger::storage::UtxoSet;
use gossip_ledger::testnet::{build_chain, genesis_wallet, mine_next};
use gossip_ledger::wallet::{self, Wallet};
use gossip_ledger::GENESIS_AMOUNT;
use tempfile::tempdir;

// Re-decode a block after editing its JSON, as a peer could send it
fn tampered(block: &Block, field: &str, value: serde_json::Value) -> Block {
    let mut json = serde_json::to_value(block).unwrap();
    json[field] = value;
    serde_json::from_value(json).unwrap()
}

#[test]
fn test_mined_blocks_meet_their_difficulty() {
    let genesis = Block::genesis();
    for difficulty in [0, 3, 10] {
        let block = Block::new_block(
            1,
            genesis.get_hash(),
            genesis.get_timestamp() + 10,
            Payload::Data("A".to_string()),
            difficulty,
        )
        .unwrap();
        assert!(ProofOfWork::validate(&block));
        assert!(ProofOfWork::hash_matches_difficulty(
            block.get_hash(),
            difficulty
        ));
    }
}

#[test]
fn test_corrupted_blocks_invalidate_chain() {
    let chain = build_chain(3, "block");
    assert!(validate_chain(&chain).is_ok());

    let mut bad_hash = chain.clone();
    bad_hash[2] = tampered(&chain[2], "hash", serde_json::json!("00".repeat(32)));
    assert!(matches!(
        validate_chain(&bad_hash),
        Err(LedgerError::ChainInvalid(_))
    ));

    let mut bad_payload = chain.clone();
    bad_payload[1] = tampered(&chain[1], "payload", serde_json::json!("rewritten"));
    assert!(validate_chain(&bad_payload).is_err());

    let mut bad_genesis = chain.clone();
    bad_genesis[0] = tampered(&chain[0], "timestamp", serde_json::json!(0));
    assert!(validate_chain(&bad_genesis).is_err());
}

#[test]
fn test_appending_unlinked_block_leaves_chain_unchanged() {
    let blockchain = Blockchain::new().unwrap();
    blockchain
        .mine_block(Payload::Data("A".to_string()))
        .unwrap();

    let stray = build_chain(3, "other").pop().unwrap();
    assert!(blockchain.add_block(stray).is_err());
    assert_eq!(blockchain.len(), 2);
}

#[test]
fn test_genesis_peer_adopts_announced_block() {
    let miner = Server::new(
        Blockchain::new().unwrap(),
        Wallet::new().unwrap(),
        "tcp://127.0.0.1:9101".to_string(),
    );
    let block1 = miner.mine(Payload::Data("A".to_string())).unwrap();
    assert_eq!(block1.get_difficulty(), 0);
    assert_eq!(miner.get_chain().len(), 2);

    let follower = Server::new(
        Blockchain::new().unwrap(),
        Wallet::new().unwrap(),
        "tcp://127.0.0.1:9102".to_string(),
    );
    assert_eq!(
        follower.handle_received_blocks(vec![block1.clone()]),
        SyncOutcome::Appended
    );
    assert_eq!(follower.get_chain().len(), 2);
    assert_eq!(follower.get_latest(), block1);
}

#[test]
fn test_transfers_and_utxo_replay_agree() {
    let sender = genesis_wallet();
    let alice = Wallet::new().unwrap();
    let bob = Wallet::new().unwrap();
    let blockchain = Blockchain::new().unwrap();

    let to_alice =
        Transaction::new_utxo_transaction(alice.get_address(), 700, &sender, &blockchain.utxo_set())
            .unwrap();
    blockchain
        .mine_block(Payload::Transactions(vec![to_alice]))
        .unwrap();

    let to_bob =
        Transaction::new_utxo_transaction(bob.get_address(), 200, &alice, &blockchain.utxo_set())
            .unwrap();
    blockchain
        .mine_block(Payload::Transactions(vec![to_bob]))
        .unwrap();

    assert_eq!(blockchain.get_balance(sender.get_address()), GENESIS_AMOUNT - 700);
    assert_eq!(blockchain.get_balance(alice.get_address()), 500);
    assert_eq!(blockchain.get_balance(bob.get_address()), 200);

    let replayed = UtxoSet::from_blocks(&blockchain.get_blocks()).unwrap();
    assert_eq!(replayed, blockchain.utxo_set());
}

#[test]
fn test_wallet_errors_surface() {
    let blockchain = Blockchain::new().unwrap();
    let pauper = Wallet::new().unwrap();

    let result = Transaction::new_utxo_transaction(
        genesis_wallet().get_address(),
        1,
        &pauper,
        &blockchain.utxo_set(),
    );
    assert!(matches!(
        result,
        Err(LedgerError::InsufficientFunds { .. })
    ));

    // an input owned by someone else cannot be signed
    let genesis_tx = Block::genesis().get_transactions()[0].clone();
    let mut theft = Transaction::new(
        vec![gossip_ledger::TxInput::new(genesis_tx.get_id(), 0)],
        vec![gossip_ledger::TxOutput::new(pauper.get_address(), GENESIS_AMOUNT)],
    )
    .unwrap();
    assert!(matches!(
        theft.sign(&pauper, &blockchain.utxo_set()),
        Err(LedgerError::KeyMismatch { .. })
    ));
}

#[test]
fn test_replayed_spend_rejected_in_later_block() {
    let sender = genesis_wallet();
    let receiver = Wallet::new().unwrap();
    let blockchain = Blockchain::new().unwrap();

    let tx = Transaction::new_utxo_transaction(
        receiver.get_address(),
        10,
        &sender,
        &blockchain.utxo_set(),
    )
    .unwrap();
    let block1 = blockchain
        .mine_block(Payload::Transactions(vec![tx.clone()]))
        .unwrap();

    let replay = mine_next(&block1, Payload::Transactions(vec![tx]));
    assert!(matches!(
        blockchain.add_block(replay),
        Err(LedgerError::UnknownReference { .. })
    ));
    assert_eq!(blockchain.len(), 2);
}

#[test]
fn test_wallet_key_file_persists_address() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("keys").join("private_key");

    let created = wallet::load_or_create(&path).unwrap();
    let loaded = wallet::load_or_create(&path).unwrap();
    assert_eq!(created.get_address(), loaded.get_address());
}
