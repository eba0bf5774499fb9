//! Template to job to candidate, through the public API only.

use pool_core::{
    double_sha256, merkle_root_from_branch, BlockTemplate, JobBuilder, JobIdSequence, PoolConfig,
    ShareSubmission, Transaction,
};

// Signed P2SH-P2WPKH transaction from BIP143.
const SEGWIT_TX: &str = "01000000000101db6b1b20aa0fd7b23880be2ecbd4a98130974cf4748fb66092ac4d3ceb1a5477010000001716001479091972186c449eb1ded22b78e40d009bdf0089feffffff02b8b4eb0b000000001976a914a457b684d7f0d539a46a45bbc043f35b59d0d96388ac0008af2f000000001976a914fd270b1ee6abcaea97fea7ad0402e8bd8ad6d77c88ac02473044022047ac8e878352d3ebbde1c94ce3a10d057c24175747116f8288e5d794d12d482f0220217f36a485cae903c713331d877c1f64677e3622ad4010726870540656fe9dcb012103ad1d8e89212f0b92c74d23bb710c00662ad1470198ac48c43f7d6f93a2a2687392040000";

const CONFIG: &str = r#"{
    "network": "mainnet",
    "payouts": [
        {"address": "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq", "percent": 90.0},
        {"address": "bc1qrp33g0q5c5txsp9arysrx4k6zdkfs4nce4xj0gdcccefvpysxf3qccfmv3", "percent": 7.5},
        {"address": "bc1p5cyxnuxmeuwuvkwfem96lqzszd02n6xdcjrs20cac6yqjjwudpxqkedrcr", "percent": 2.5}
    ],
    "extranonce1_size": 4,
    "extranonce2_size": 8
}"#;

fn template_json() -> String {
    format!(
        r#"{{
            "capabilities": ["proposal"],
            "version": 536870912,
            "previousblockhash": "00000000000000000002a7c4c1e48d76c5a37902165a270156b7a8d72728a054",
            "transactions": [{{"data": "{SEGWIT_TX}", "fee": 1000}}],
            "coinbasevalue": 312500123,
            "bits": "17034219",
            "height": 840000,
            "curtime": 1713571767
        }}"#
    )
}

#[test]
fn test_template_to_candidate() {
    let settings = PoolConfig::from_json(CONFIG).unwrap().validate().unwrap();
    let template = BlockTemplate::from_json(&template_json()).unwrap();
    let ids = JobIdSequence::new();

    let job = JobBuilder::new(&settings, &template)
        .job_id(ids.next_id())
        .timestamp(1_713_571_767)
        .build()
        .unwrap();

    // Payout values are conserved; the commitment replaced the first script.
    let coinbase = &job.block().transactions[0];
    assert_eq!(coinbase.outputs.len(), 3);
    assert_eq!(coinbase.outputs.iter().map(|o| o.value).sum::<u64>(), 312_500_123);
    assert_eq!(&coinbase.outputs[0].script_pubkey[..6], &[0x6a, 0x24, 0xaa, 0x21, 0xa9, 0xed]);
    assert_eq!(coinbase.outputs[1].script_pubkey, settings.payouts[1].script_pubkey);
    assert_eq!(coinbase.outputs[2].script_pubkey, settings.payouts[2].script_pubkey);

    // Template transaction keeps its witness in the block.
    let segwit = &job.block().transactions[1];
    assert!(segwit.has_witness());
    assert_eq!(hex::encode(segwit.serialize()), SEGWIT_TX);
    assert_eq!(job.merkle_branch(), &[segwit.txid()]);

    let notify = serde_json::to_value(job.notify()).unwrap();
    assert_eq!(notify["params"][0], "0");
    assert_eq!(notify["params"][6], "17034219");

    let share: ShareSubmission = serde_json::from_str(
        r#"{"nonce": 42, "extranonce1": "01020304", "extranonce2": "0a0b0c0d0e0f1011", "version_mask": 8192}"#,
    )
    .unwrap();
    let candidate = job.candidate(&share).unwrap();

    // What a miner computes from coinb1/coinb2 and the branch.
    let mut coinbase_bytes = job.coinb1().to_vec();
    coinbase_bytes.extend_from_slice(&share.extranonce1);
    coinbase_bytes.extend_from_slice(&share.extranonce2);
    coinbase_bytes.extend_from_slice(job.coinb2());
    let miner_root = merkle_root_from_branch(&double_sha256(&coinbase_bytes), job.merkle_branch());

    assert_eq!(candidate.merkle_root(), miner_root);
    assert_eq!(candidate.header().nonce, 42);
    assert_eq!(candidate.header().version, 0x20002000);
    assert_eq!(candidate.hash(), double_sha256(&candidate.header_bytes()));

    // The serialized block decodes back to the same transactions.
    let bytes = candidate.serialize();
    let mut offset = 81;
    for tx in candidate.transactions() {
        let len = tx.serialize().len();
        assert_eq!(Transaction::from_bytes(&bytes[offset..offset + len]).unwrap(), *tx);
        offset += len;
    }
    assert_eq!(offset, bytes.len());
}
