// Entry point for the ledger CLI
use clap::Parser;
use data_encoding::HEXLOWER;
use log::{error, LevelFilter};
use std::process;
use utxo_chain::{
    Block, Blockchain, Command, Config, MiningSignal, Opt, ProofOfWork, SledStore, Transaction,
    UTXOScanner,
};

fn main() {
    env_logger::builder().filter_level(LevelFilter::Info).init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt.command) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn mining_signal(config: &Config) -> MiningSignal {
    match config.mining_timeout() {
        Some(timeout) => MiningSignal::with_timeout(timeout),
        None => MiningSignal::new(),
    }
}

fn run_command(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    match command {
        Command::Createblockchain { address } => {
            let blockchain = Blockchain::create_blockchain_with_path(
                &address,
                &config.data_dir,
                config.difficulty,
            )?;
            blockchain.close()?;
            println!("Done!");
        }
        Command::GetBalance { address } => {
            let blockchain = Blockchain::new_blockchain_with_path(&config.data_dir)?;
            let balance = UTXOScanner::new(&blockchain).get_balance(&address)?;
            println!("Balance of {address}: {balance}");
        }
        Command::Send { from, to, amount } => {
            let mut blockchain = Blockchain::new_blockchain_with_path(&config.data_dir)?;
            let transaction = {
                let utxo_scanner = UTXOScanner::new(&blockchain);
                Transaction::new_utxo_transaction(&from, &to, amount, &utxo_scanner)?
            };
            blockchain.mine_block_with_signal(&[transaction], &mining_signal(&config))?;
            blockchain.close()?;
            println!("Success!");
        }
        Command::Printchain => {
            let blockchain = Blockchain::new_blockchain_with_path(&config.data_dir)?;
            for block in blockchain.iterator() {
                print_block(&block?);
            }
        }
    }
    Ok(())
}

fn print_block(block: &Block) {
    println!("Prev. hash: {}", HEXLOWER.encode(block.get_pre_block_hash()));
    println!("Hash: {}", block.get_hash_hex());
    println!("Nonce: {}", block.get_nonce());

    for tx in block.get_transactions() {
        println!("- Transaction {}", HEXLOWER.encode(tx.get_id()));
        if !tx.is_coinbase() {
            for input in tx.get_vin() {
                println!(
                    "-- Input txid = {}, vout = {}, from = {}",
                    HEXLOWER.encode(input.get_txid()),
                    input.get_vout(),
                    input.get_authorization(),
                );
            }
        }
        for output in tx.get_vout() {
            println!(
                "-- Output value = {}, to = {}",
                output.get_value(),
                output.get_owner()
            );
        }
    }
    println!("PoW: {}", ProofOfWork::validate(block));
    println!();
}
