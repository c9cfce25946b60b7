use trinet::{Network, Topology};

fn main() -> trinet::Result<()> {
    let mut network = Network::new(Topology::new(2, 3, 1))?;
    network.set_learning_rate(0.5);
    network.set_momentum(true, 0.9);

    let inputs = vec![
        vec![1.0, 0.0],
        vec![1.0, 1.0],
        vec![0.0, 1.0],
        vec![0.0, 0.0],
    ];
    let expected_outputs = vec![
        vec![1.0],
        vec![0.0],
        vec![1.0],
        vec![0.0],
    ];

    let epochs = 10000;

    for epoch in 0..epochs {
        let mut loss = 0.0;
        for (input, expected) in inputs.iter().zip(expected_outputs.iter()) {
            network.set_inputs(input)?;
            network.set_desired_outputs(expected)?;
            network.feed_forward()?;
            loss += network.calculate_error();
            network.back_propagate()?;
        }
        if epoch % 1000 == 0 {
            println!("Epoch {epoch}: loss = {:.6}", loss / inputs.len() as f64);
        }
    }

    for input in &inputs {
        println!("Input: {:?} -> Output: {:.4}", input, network.run(input)?[0]);
    }
    Ok(())
}
